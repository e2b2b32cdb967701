use serde::Deserialize;

/// Fixed weights for the headless probe battery. Each probe contributes
/// its weight independently; the sum is unbounded and never clamped.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadlessWeights {
    #[serde(default = "default_automation_flag")]
    pub automation_flag: i64,
    #[serde(default = "default_engine_mismatch")]
    pub engine_mismatch: i64,
    #[serde(default = "default_injected_dom")]
    pub injected_dom: i64,
    #[serde(default = "default_software_gpu")]
    pub software_gpu: i64,
    #[serde(default = "default_gpu_probe_failure")]
    pub gpu_probe_failure: i64,
    #[serde(default = "default_zero_plugins")]
    pub zero_plugins: i64,
    #[serde(default = "default_empty_languages")]
    pub empty_languages: i64,
}

fn default_automation_flag() -> i64 {
    100
}
fn default_engine_mismatch() -> i64 {
    20
}
fn default_injected_dom() -> i64 {
    50
}
fn default_software_gpu() -> i64 {
    30
}
fn default_gpu_probe_failure() -> i64 {
    10
}
fn default_zero_plugins() -> i64 {
    15
}
fn default_empty_languages() -> i64 {
    10
}

impl Default for HeadlessWeights {
    fn default() -> Self {
        Self {
            automation_flag: default_automation_flag(),
            engine_mismatch: default_engine_mismatch(),
            injected_dom: default_injected_dom(),
            software_gpu: default_software_gpu(),
            gpu_probe_failure: default_gpu_probe_failure(),
            zero_plugins: default_zero_plugins(),
            empty_languages: default_empty_languages(),
        }
    }
}

/// Thresholds the client mirrors when computing its `sentinel_timing`
/// hint. The server recomputes the same rules from the raw metadata, so
/// these only exist to keep the hint comparable.
#[derive(Debug, Clone)]
pub struct CollectorTiming {
    pub min_interaction_ms: u64,
    pub min_typing_ms: u64,
    pub fast_submission_penalty: i64,
    pub fast_typing_penalty: i64,
}

/// Render the in-page collector. The script makes no network calls of its
/// own: it measures, probes, fingerprints, then intercepts the form
/// submit, swaps in fresh `sentinel_*` hidden fields, and re-triggers the
/// native submission exactly once. Every probe and every fingerprint
/// component is wrapped so one failure can never abort the rest.
pub fn collector_script(weights: &HeadlessWeights, timing: &CollectorTiming) -> String {
    format!(
        r#"(function () {{
  'use strict';
  var tLoad = Date.now();
  var tFirstFocus = null;
  var tFirstKey = null;

  function probeHeadless() {{
    var score = 0;
    try {{ if (navigator.webdriver) score += {automation_flag}; }} catch (e) {{}}
    try {{
      if (/Chrome/.test(navigator.userAgent) && typeof window.chrome === 'undefined') score += {engine_mismatch};
    }} catch (e) {{}}
    try {{
      if (window._phantom || window.__nightmare || window.callPhantom ||
          document.__selenium_unwrapped || document.__webdriver_evaluate ||
          document.__driver_evaluate || navigator.__webdriver_script_fn) score += {injected_dom};
    }} catch (e) {{}}
    try {{
      var c = document.createElement('canvas');
      var gl = c.getContext('webgl') || c.getContext('experimental-webgl');
      var ext = gl.getExtension('WEBGL_debug_renderer_info');
      var renderer = gl.getParameter(ext.UNMASKED_RENDERER_WEBGL);
      if (/swiftshader|llvmpipe|software|mesa offscreen/i.test(renderer)) score += {software_gpu};
    }} catch (e) {{ score += {gpu_probe_failure}; }}
    try {{ if (navigator.plugins.length === 0) score += {zero_plugins}; }} catch (e) {{}}
    try {{ if (!navigator.languages || navigator.languages.length === 0) score += {empty_languages}; }} catch (e) {{}}
    return score;
  }}

  function part(fn) {{
    try {{
      var v = fn();
      return (v === undefined || v === null) ? 'unavailable' : String(v);
    }} catch (e) {{
      return 'unavailable';
    }}
  }}

  function canvasSignature() {{
    var c = document.createElement('canvas');
    c.width = 220;
    c.height = 40;
    var ctx = c.getContext('2d');
    ctx.textBaseline = 'top';
    ctx.font = '16px Arial';
    ctx.fillStyle = '#f60';
    ctx.fillRect(110, 2, 60, 20);
    ctx.fillStyle = '#069';
    ctx.fillText('palisade,fp <canvas> 1.0', 4, 8);
    return c.toDataURL().slice(-64);
  }}

  function webglStrings() {{
    var c = document.createElement('canvas');
    var gl = c.getContext('webgl') || c.getContext('experimental-webgl');
    var ext = gl.getExtension('WEBGL_debug_renderer_info');
    return gl.getParameter(ext.UNMASKED_VENDOR_WEBGL) + '~' + gl.getParameter(ext.UNMASKED_RENDERER_WEBGL);
  }}

  function fontProbe() {{
    var candidates = ['Arial', 'Verdana', 'Times New Roman', 'Courier New', 'Georgia',
                      'Palatino', 'Garamond', 'Comic Sans MS', 'Trebuchet MS', 'Impact'];
    var baselines = ['monospace', 'sans-serif', 'serif'];
    var span = document.createElement('span');
    span.style.position = 'absolute';
    span.style.left = '-9999px';
    span.style.fontSize = '72px';
    span.textContent = 'mmmmmmmmmmlli';
    document.body.appendChild(span);
    var baseWidths = {{}};
    for (var i = 0; i < baselines.length; i++) {{
      span.style.fontFamily = baselines[i];
      baseWidths[baselines[i]] = span.offsetWidth;
    }}
    var detected = [];
    for (var j = 0; j < candidates.length; j++) {{
      var hit = true;
      for (var k = 0; k < baselines.length; k++) {{
        span.style.fontFamily = "'" + candidates[j] + "'," + baselines[k];
        if (span.offsetWidth === baseWidths[baselines[k]]) {{ hit = false; break; }}
      }}
      if (hit) detected.push(candidates[j]);
    }}
    document.body.removeChild(span);
    return detected.join(',');
  }}

  function fingerprint() {{
    var parts = [
      part(function () {{ return screen.width + 'x' + screen.height + 'x' + screen.colorDepth; }}),
      part(function () {{ return new Date().getTimezoneOffset(); }}),
      part(function () {{ return navigator.userAgent; }}),
      part(function () {{ return navigator.platform; }}),
      part(function () {{ return navigator.hardwareConcurrency; }}),
      part(function () {{ return navigator.language; }}),
      part(canvasSignature),
      part(webglStrings),
      part(fontProbe)
    ];
    var joined = parts.join('|');
    var hash = 0;
    for (var i = 0; i < joined.length; i++) {{
      hash = ((hash * 31) + joined.charCodeAt(i)) | 0;
    }}
    return Math.abs(hash).toString(36);
  }}

  function timingHint(meta) {{
    var s = 0;
    if ((meta.t_load_to_submit || 0) < {min_interaction_ms}) s += {fast_submission_penalty};
    if (meta.t_typing_duration !== null && meta.t_typing_duration > 0 &&
        meta.t_typing_duration < {min_typing_ms}) s += {fast_typing_penalty};
    return s;
  }}

  function addHidden(form, name, value) {{
    var input = document.createElement('input');
    input.type = 'hidden';
    input.name = name;
    input.value = value;
    form.appendChild(input);
  }}

  function arm() {{
    var form = document.querySelector('form[data-palisade]') || document.querySelector('form');
    if (!form) return;
    var username = form.querySelector('input[name="username"]');
    var password = form.querySelector('input[name="password"]');

    if (username) {{
      username.addEventListener('focus', function () {{
        if (tFirstFocus === null) tFirstFocus = Date.now() - tLoad;
      }});
    }}
    var markKey = function () {{
      if (tFirstKey === null) tFirstKey = Date.now() - tLoad;
    }};
    if (username) username.addEventListener('keydown', markKey);
    if (password) password.addEventListener('keydown', markKey);

    form.addEventListener('submit', function (ev) {{
      ev.preventDefault();
      var tSubmit = Date.now() - tLoad;
      var meta = {{
        t_load_to_submit: tSubmit,
        t_first_focus: tFirstFocus,
        t_first_key: tFirstKey,
        t_typing_duration: tFirstKey === null ? null : tSubmit - tFirstKey
      }};
      // Repeated submits on the same page must not stack stale bundles.
      var stale = form.querySelectorAll('input[name^="sentinel_"]');
      for (var i = 0; i < stale.length; i++) {{
        stale[i].parentNode.removeChild(stale[i]);
      }}
      addHidden(form, 'sentinel_timing', timingHint(meta));
      addHidden(form, 'sentinel_headless', probeHeadless());
      addHidden(form, 'sentinel_fingerprint', fingerprint());
      addHidden(form, 'sentinel_metadata', JSON.stringify(meta));
      // Native submit bypasses this listener, so it fires exactly once.
      form.submit();
    }});
  }}

  if (document.readyState === 'loading') {{
    document.addEventListener('DOMContentLoaded', arm);
  }} else {{
    arm();
  }}
}})();
"#,
        automation_flag = weights.automation_flag,
        engine_mismatch = weights.engine_mismatch,
        injected_dom = weights.injected_dom,
        software_gpu = weights.software_gpu,
        gpu_probe_failure = weights.gpu_probe_failure,
        zero_plugins = weights.zero_plugins,
        empty_languages = weights.empty_languages,
        min_interaction_ms = timing.min_interaction_ms,
        min_typing_ms = timing.min_typing_ms,
        fast_submission_penalty = timing.fast_submission_penalty,
        fast_typing_penalty = timing.fast_typing_penalty,
    )
}
