/// The one rejection string every refused attempt sees, whether a layer
/// tripped the score threshold or the password was simply wrong. Keeping
/// it identical denies an adversary a tuning oracle.
pub const REJECTION_MESSAGE: &str = "Invalid username or password.";

pub fn login_page(error: Option<&str>) -> String {
    let error_html = match error {
        Some(msg) => format!(r#"<div class="error">{}</div>"#, msg),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Sign in</title>
<style>
*{{margin:0;padding:0;box-sizing:border-box}}
body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;background:#0a0a0f;color:#e2e8f0;display:flex;align-items:center;justify-content:center;min-height:100vh}}
.card{{background:#111827;border:1px solid #1f2937;border-radius:.75rem;padding:2.5rem;width:100%;max-width:380px}}
h1{{font-size:1.5rem;font-weight:700;margin-bottom:1.5rem}}
label{{display:block;font-size:.875rem;color:#9ca3af;margin-bottom:.375rem}}
input{{width:100%;background:#1a1a2e;border:1px solid #2d2d52;border-radius:.375rem;padding:.625rem .75rem;color:#e2e8f0;margin-bottom:1rem;font-size:.95rem}}
button{{width:100%;background:#6366f1;color:#fff;border:none;padding:.75rem;border-radius:.5rem;font-weight:600;font-size:.95rem;cursor:pointer}}
.error{{background:#7f1d1d33;border:1px solid #7f1d1d;border-radius:.375rem;padding:.625rem .75rem;color:#fca5a5;font-size:.875rem;margin-bottom:1rem}}
</style>
</head>
<body>
<div class="card">
  <h1>Sign in</h1>
  {error_html}
  <form method="post" action="/login" data-palisade>
    <label for="username">Username</label>
    <input type="text" id="username" name="username" autocomplete="username" required>
    <label for="password">Password</label>
    <input type="password" id="password" name="password" autocomplete="current-password" required>
    <button type="submit">Sign in</button>
  </form>
</div>
</body>
</html>"#
    )
}

pub fn success_page(username: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Signed in</title>
<style>
*{{margin:0;padding:0;box-sizing:border-box}}
body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;background:#0a0a0f;color:#e2e8f0;display:flex;align-items:center;justify-content:center;min-height:100vh}}
.card{{background:#111827;border:1px solid #1f2937;border-radius:.75rem;padding:2.5rem;text-align:center}}
h1{{font-size:1.5rem;margin-bottom:.75rem}}
p{{color:#9ca3af}}
a{{color:#6366f1}}
</style>
</head>
<body>
<div class="card">
  <h1>Welcome, {username}</h1>
  <p>You are signed in. <a href="/">Sign out</a></p>
</div>
</body>
</html>"#
    )
}
