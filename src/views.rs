//! Server-rendered HTML fragments shared by the page handlers.

use std::{fmt, str::FromStr};

use axum::response::Html;
use serde::{de, Deserialize, Deserializer};
use time::{macros::format_description, OffsetDateTime};

use crate::properties::repo_types::Property;
use crate::session::Session;

const CSS: &str = r#"
body{font-family:system-ui,sans-serif;margin:0;background:#f6f7f9;color:#1f2933}
.nav{display:flex;gap:1rem;align-items:center;padding:.75rem 1.5rem;background:#1f3a5f;color:#fff}
.nav a,.nav button{color:#fff;text-decoration:none;background:none;border:0;font:inherit;cursor:pointer}
.nav .spacer{flex:1}
.container{max-width:1100px;margin:1.5rem auto;padding:0 1rem}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(300px,1fr));gap:1rem}
.card{background:#fff;border-radius:8px;padding:1rem;box-shadow:0 1px 3px rgba(0,0,0,.08)}
.price{font-size:1.3rem;font-weight:700;color:#1f3a5f}
.badge{display:inline-block;padding:.1rem .5rem;border-radius:4px;font-size:.8rem;background:#e4e7eb}
.notice{padding:.75rem 1rem;border-radius:6px;margin-bottom:1rem}
.notice.ok{background:#e3f9e5;color:#1f6b2a}
.notice.err{background:#fde8e8;color:#8a1c1c}
form.stack label{display:block;margin:.5rem 0 .2rem}
form.stack input,form.stack select,form.stack textarea{width:100%;padding:.4rem}
table{width:100%;border-collapse:collapse;background:#fff}
td,th{padding:.5rem;border-bottom:1px solid #e4e7eb;text-align:left}
"#;

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Serde helper for form and query fields: blank means absent, anything else must parse.
pub fn empty_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Whole dollars with thousands separators: `$1,250,000`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_date(ts: OffsetDateTime) -> String {
    ts.format(format_description!("[month repr:short] [day], [year]"))
        .unwrap_or_default()
}

fn nav(session: &Session) -> String {
    let account = match session.identity() {
        Some(identity) => format!(
            r#"<a href="{dash}">{name}</a>
            <form method="post" action="/logout" style="margin:0"><button type="submit">Log out</button></form>"#,
            dash = identity.user_role.dashboard_path(),
            name = escape(&identity.user_name),
        ),
        None => r#"<a href="/login">Log in</a><a href="/register">Register</a>"#.to_string(),
    };
    format!(
        r#"<nav class="nav"><a href="/properties"><strong>EstateHub</strong></a>
        <a href="/properties">Listings</a><span class="spacer"></span>{account}</nav>"#
    )
}

pub fn layout(title: &str, session: &Session, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8">
        <meta name="viewport" content="width=device-width,initial-scale=1">
        <title>{title} | EstateHub</title><style>{CSS}</style></head>
        <body>{nav}<main class="container">{body}</main></body></html>"#,
        title = escape(title),
        nav = nav(session),
    ))
}

pub fn notice(message: &str, success: bool) -> String {
    format!(
        r#"<div class="notice {class}">{message}</div>"#,
        class = if success { "ok" } else { "err" },
        message = escape(message),
    )
}

pub fn property_card(p: &Property) -> String {
    format!(
        r#"<a class="card" href="/properties/{id}" style="text-decoration:none;color:inherit">
        <div class="price">{price}</div>
        <h3>{title}</h3>
        <div>{address}, {city}, {state} {zip}</div>
        <div>{beds} bd · {baths} ba · {sqft} sqft</div>
        <span class="badge">{kind}</span> <span class="badge">{status}</span>{featured}
        </a>"#,
        id = p.id,
        price = format_price(p.price),
        title = escape(&p.title),
        address = escape(&p.address),
        city = escape(&p.city),
        state = escape(&p.state),
        zip = escape(&p.zip_code),
        beds = p.bedrooms,
        baths = p.bathrooms,
        sqft = p.area_sqft,
        kind = escape(&p.property_type),
        status = p.status.as_str(),
        featured = if p.featured {
            r#" <span class="badge">featured</span>"#
        } else {
            ""
        },
    )
}

pub fn login_page(session: &Session, message: Option<(&str, bool)>, email: &str) -> Html<String> {
    let body = format!(
        r#"<div class="card" style="max-width:420px;margin:auto">
        <h2>Log in</h2>{notice}
        <form class="stack" method="post" action="/login">
            <label for="email">Email</label>
            <input id="email" name="email" type="email" value="{email}" required>
            <label for="password">Password</label>
            <input id="password" name="password" type="password" required>
            <p><button type="submit">Log in</button></p>
        </form>
        <p>No account yet? <a href="/register">Register</a></p></div>"#,
        notice = message.map(|(m, ok)| notice(m, ok)).unwrap_or_default(),
        email = escape(email),
    );
    layout("Log in", session, &body)
}

/// Previously entered values, echoed back when the form is re-rendered.
#[derive(Debug, Default)]
pub struct RegisterValues<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub role: &'a str,
}

pub fn register_page(
    session: &Session,
    message: Option<&str>,
    values: &RegisterValues<'_>,
) -> Html<String> {
    let selected = |role: &str| if values.role == role { " selected" } else { "" };
    let body = format!(
        r#"<div class="card" style="max-width:480px;margin:auto">
        <h2>Create an account</h2>{notice}
        <form class="stack" method="post" action="/register">
            <label for="full_name">Full name</label>
            <input id="full_name" name="full_name" value="{full_name}" required>
            <label for="email">Email</label>
            <input id="email" name="email" type="email" value="{email}" required>
            <label for="phone">Phone (optional)</label>
            <input id="phone" name="phone" value="{phone}">
            <label for="password">Password (at least 8 characters)</label>
            <input id="password" name="password" type="password" minlength="8" required>
            <label for="role">I want to</label>
            <select id="role" name="role">
                <option value="buyer"{buyer}>Buy a property</option>
                <option value="seller"{seller}>Sell a property</option>
            </select>
            <p><button type="submit">Register</button></p>
        </form>
        <p>Already registered? <a href="/login">Log in</a></p></div>"#,
        notice = message.map(|m| notice(m, false)).unwrap_or_default(),
        full_name = escape(values.full_name),
        email = escape(values.email),
        phone = escape(values.phone),
        buyer = selected("buyer"),
        seller = selected("seller"),
    );
    layout("Register", session, &body)
}

pub fn not_found(session: &Session, what: &str) -> Html<String> {
    layout(
        "Not found",
        session,
        &format!(
            r#"<h2>{what} not found</h2><p><a href="/properties">Back to listings</a></p>"#,
            what = escape(what)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn prices_are_grouped_by_thousands() {
        assert_eq!(format_price(0), "$0");
        assert_eq!(format_price(950), "$950");
        assert_eq!(format_price(95_000), "$95,000");
        assert_eq!(format_price(1_250_000), "$1,250,000");
        assert_eq!(format_price(-4_500), "-$4,500");
    }

    #[test]
    fn dates_are_short_and_readable() {
        assert_eq!(format_date(datetime!(2024-02-03 12:00 UTC)), "Feb 03, 2024");
    }

    #[test]
    fn login_page_escapes_the_echoed_email() {
        let Html(page) = login_page(&Session::detached(), Some(("Nope", false)), "\"><b>x");
        assert!(page.contains("&quot;&gt;&lt;b&gt;x"));
        assert!(page.contains(r#"<div class="notice err">Nope</div>"#));
        assert!(page.contains(r#"href="/login""#));
    }
}
