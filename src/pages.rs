use axum::{
    extract::Path,
    response::Html,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{auth::extractors::CurrentUser, state::AppState};

pub fn public_pages() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/register", get(register_page))
        .route("/api-test", get(api_test_page))
}

/// Browser pages behind the redirecting gate.
pub fn protected_pages() -> Router<AppState> {
    Router::new()
        .route("/", get(home_page))
        .route("/dashboard", get(dashboard_page))
        .route("/events/:id", get(event_details_page))
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} · Guestlist</title>
<link rel="stylesheet" href="/static/app.css">
</head>
<body>
<nav><a href="/dashboard">Dashboard</a><a href="/logout">Log out</a></nav>
<main>
{body}
</main>
</body>
</html>"#
    ))
}

async fn login_page() -> Html<String> {
    layout(
        "Log in",
        r#"<h1>Log in</h1>
<form id="login">
<input name="email" type="email" placeholder="Email" required>
<input name="password" type="password" placeholder="Password" required>
<button>Log in</button>
<p class="error" hidden></p>
</form>
<p><a href="/register">Create an account</a></p>
<script>
document.getElementById("login").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const f = new FormData(ev.target);
  const res = await fetch("/api/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({
      email: f.get("email"),
      password: f.get("password"),
      return_to: new URLSearchParams(location.search).get("return_to"),
    }),
  });
  if (res.ok) { location.href = (await res.json()).redirect; return; }
  const err = ev.target.querySelector(".error");
  err.textContent = await res.text();
  err.hidden = false;
});
</script>"#,
    )
}

async fn register_page() -> Html<String> {
    layout(
        "Register",
        r#"<h1>Register</h1>
<form id="register">
<input name="name" placeholder="Name" required>
<input name="email" type="email" placeholder="Email" required>
<input name="password" type="password" placeholder="Password (8+ characters)" required>
<button>Register</button>
<p class="error" hidden></p>
</form>
<script>
document.getElementById("register").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const f = new FormData(ev.target);
  const res = await fetch("/api/register", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(Object.fromEntries(f)),
  });
  if (res.ok) { location.href = "/login"; return; }
  const err = ev.target.querySelector(".error");
  err.textContent = await res.text();
  err.hidden = false;
});
</script>"#,
    )
}

/// Hand-driven request console for the JSON API; uses the session cookie.
async fn api_test_page() -> Html<String> {
    layout(
        "API test",
        r#"<h1>API test</h1>
<form id="call">
<select name="method">
<option>GET</option><option>POST</option><option>PUT</option>
</select>
<input name="path" value="/api/me" required>
<textarea name="body" rows="6" placeholder='{"name": "Party"}'></textarea>
<button>Send</button>
</form>
<pre id="result"></pre>
<script>
document.getElementById("call").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const f = new FormData(ev.target);
  const init = { method: f.get("method"), headers: {} };
  if (f.get("method") !== "GET" && f.get("body")) {
    init.headers["Content-Type"] = "application/json";
    init.body = f.get("body");
  }
  const res = await fetch(f.get("path"), init);
  document.getElementById("result").textContent =
    res.status + " " + res.statusText + "\n\n" + await res.text();
});
</script>"#,
    )
}

async fn home_page(_user: CurrentUser) -> Html<String> {
    layout("Home", r#"<h1>Guestlist</h1><p><a href="/dashboard">Your events</a></p>"#)
}

async fn dashboard_page(_user: CurrentUser) -> Html<String> {
    layout(
        "Dashboard",
        r#"<h1>Your events</h1>
<ul id="events"></ul>
<script>
fetch("/api/events").then(r => r.json()).then(events => {
  const list = document.getElementById("events");
  for (const e of events) {
    const li = document.createElement("li");
    const a = document.createElement("a");
    a.href = "/events/" + e.id;
    a.textContent = e.name + " (" + e.date_time + ")";
    li.appendChild(a);
    list.appendChild(li);
  }
});
</script>"#,
    )
}

async fn event_details_page(_user: CurrentUser, Path(id): Path<Uuid>) -> Html<String> {
    layout(
        "Event",
        &format!(
            r#"<h1 id="name"></h1>
<p id="description"></p>
<ul id="guests"></ul>
<script>
fetch("/api/events/{id}").then(r => r.json()).then(ev => {{
  document.getElementById("name").textContent = ev.name;
  document.getElementById("description").textContent = ev.description;
  const list = document.getElementById("guests");
  for (const g of ev.guests) {{
    const li = document.createElement("li");
    li.textContent = g.name + (g.attended ? " ✓" : "");
    if (g.qr_code) {{
      const img = document.createElement("img");
      img.src = "data:image/png;base64," + g.qr_code;
      img.width = 128;
      li.appendChild(img);
    }}
    list.appendChild(li);
  }}
}});
</script>"#
        ),
    )
}
