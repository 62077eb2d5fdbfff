use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::CurrentSession,
        repo_types::{Role, User, UserStatus},
        services::{AuthService, Denied},
    },
    inquiries::{Inquiry, InquiryStatus, Message},
    properties::{favorites, repo_types::Property},
    reports::{Report, ReportStatus},
    session::SessionData,
    state::AppState,
    views::{self, empty_as_none, escape, format_date, format_price},
};

pub fn buyer_routes() -> Router<AppState> {
    Router::new().route("/buyer/dashboard", get(buyer_dashboard))
}

pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/seller/dashboard", get(seller_dashboard))
        .route("/seller/inquiries/:id/status", post(update_inquiry))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/admin/reports/:id/status", post(update_report))
        .route("/admin/users/:id/status", post(update_user))
}

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/messages/read", post(mark_messages_read))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    status: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    reply: Option<String>,
}

fn notice_text(code: &str) -> Option<(&'static str, bool)> {
    Some(match code {
        "updated" => ("Status updated.", true),
        "not-allowed" => ("That status change is not allowed.", false),
        "invalid" => ("Unknown status.", false),
        "self" => ("You cannot deactivate your own account.", false),
        "read" => ("All messages marked as read.", true),
        _ => return None,
    })
}

fn flash(query: &DashboardQuery) -> String {
    query
        .notice
        .as_deref()
        .and_then(notice_text)
        .map(|(m, ok)| views::notice(m, ok))
        .unwrap_or_default()
}

fn redirect_with(path: &str, code: &str) -> Redirect {
    Redirect::to(&format!("{path}?notice={code}"))
}

fn listing_table(listings: &[Property]) -> String {
    if listings.is_empty() {
        return "<p>No listings yet.</p>".to_string();
    }
    let rows: String = listings
        .iter()
        .map(|p| {
            format!(
                r#"<tr><td><a href="/properties/{id}">{title}</a></td><td>{city}</td><td>{price}</td><td>{status}</td></tr>"#,
                id = p.id,
                title = escape(&p.title),
                city = escape(&p.city),
                price = format_price(p.price),
                status = p.status.as_str(),
            )
        })
        .collect();
    format!("<table><tr><th>Listing</th><th>City</th><th>Price</th><th>Status</th></tr>{rows}</table>")
}

fn inbox_section(messages: &[Message], unread: i64) -> String {
    let items: String = messages
        .iter()
        .map(|m| {
            format!(
                "<li>{bold}<strong>{from}</strong>: {body} <small>{when}</small>{end}</li>",
                bold = if m.is_read { "" } else { "<em>" },
                end = if m.is_read { "" } else { "</em>" },
                from = escape(m.sender_name.as_deref().unwrap_or("Unknown sender")),
                body = escape(&m.body),
                when = format_date(m.created_at),
            )
        })
        .collect();
    let mark = if unread > 0 {
        r#"<form method="post" action="/messages/read"><button type="submit">Mark all as read</button></form>"#
    } else {
        ""
    };
    format!(
        "<h3>Messages ({unread} unread)</h3>{list}{mark}",
        list = if messages.is_empty() {
            "<p>No messages.</p>".to_string()
        } else {
            format!("<ul>{items}</ul>")
        },
    )
}

#[instrument(skip(state, auth, session))]
pub async fn buyer_dashboard(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, Denied> {
    let buyer = auth.check_permission(&session, &[Role::Buyer])?;
    let repo = state.repo.as_ref();

    let saved = favorites::list_for_buyer(repo, buyer.user_id).await;
    let inquiries = Inquiry::list_for_buyer(repo, buyer.user_id).await;
    let inbox = Message::inbox(repo, buyer.user_id).await;
    let unread = Message::unread_count(repo, buyer.user_id).await;

    let inquiry_rows: String = inquiries
        .iter()
        .map(|i| {
            format!(
                r#"<tr><td><a href="/properties/{pid}">{title}</a></td><td>{msg}</td><td>{status}</td><td>{when}</td></tr>"#,
                pid = i.property_id,
                title = escape(i.property_title.as_deref().unwrap_or("Listing")),
                msg = escape(&i.message),
                status = i.status.as_str(),
                when = format_date(i.created_at),
            )
        })
        .collect();

    let body = format!(
        r#"{flash}<h2>Welcome, {name}</h2>
        <h3>Saved listings</h3>{saved}
        <h3>Your inquiries</h3>{inquiries}
        {inbox}"#,
        flash = flash(&query),
        name = escape(&buyer.user_name),
        saved = listing_table(&saved),
        inquiries = if inquiries.is_empty() {
            r#"<p>No inquiries yet. <a href="/properties">Browse listings</a>.</p>"#.to_string()
        } else {
            format!("<table><tr><th>Listing</th><th>Message</th><th>Status</th><th>Sent</th></tr>{inquiry_rows}</table>")
        },
        inbox = inbox_section(&inbox, unread),
    );
    Ok(views::layout("Buyer dashboard", &session, &body))
}

fn inquiry_actions(i: &Inquiry) -> String {
    let options: String = [InquiryStatus::Responded, InquiryStatus::Closed]
        .into_iter()
        .filter(|next| next.reachable_from().contains(&i.status.as_str()))
        .map(|next| format!(r#"<option value="{s}">{s}</option>"#, s = next.as_str()))
        .collect();
    if options.is_empty() {
        return String::new();
    }
    format!(
        r#"<form method="post" action="/seller/inquiries/{id}/status">
        <input name="reply" placeholder="Reply to buyer (optional)">
        <select name="status">{options}</select> <button type="submit">Update</button></form>"#,
        id = i.id
    )
}

#[instrument(skip(state, auth, session))]
pub async fn seller_dashboard(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, Denied> {
    let seller = auth.check_permission(&session, &[Role::Seller])?;
    let repo = state.repo.as_ref();

    let listings = Property::list_by_seller(repo, seller.user_id).await;
    let inquiries = Inquiry::list_for_seller(repo, seller.user_id).await;
    let inbox = Message::inbox(repo, seller.user_id).await;
    let unread = Message::unread_count(repo, seller.user_id).await;

    let inquiry_rows: String = inquiries
        .iter()
        .map(|i| {
            format!(
                "<tr><td>{title}</td><td>{buyer}</td><td>{msg}</td><td>{status}</td><td>{actions}</td></tr>",
                title = escape(i.property_title.as_deref().unwrap_or("Listing")),
                buyer = escape(i.buyer_name.as_deref().unwrap_or("Buyer")),
                msg = escape(&i.message),
                status = i.status.as_str(),
                actions = inquiry_actions(i),
            )
        })
        .collect();

    let body = format!(
        r#"{flash}<h2>Welcome, {name}</h2>
        <h3>Your listings ({count})</h3>{listings}
        <h3>Inquiries</h3>{inquiries}
        {inbox}"#,
        flash = flash(&query),
        name = escape(&seller.user_name),
        count = listings.len(),
        listings = listing_table(&listings),
        inquiries = if inquiries.is_empty() {
            "<p>No inquiries yet.</p>".to_string()
        } else {
            format!("<table><tr><th>Listing</th><th>Buyer</th><th>Message</th><th>Status</th><th></th></tr>{inquiry_rows}</table>")
        },
        inbox = inbox_section(&inbox, unread),
    );
    Ok(views::layout("Seller dashboard", &session, &body))
}

/// Sellers move inquiries on their own listings; an optional reply is sent
/// to the buyer once the change is stored.
#[instrument(skip(state, auth, session, form))]
pub async fn update_inquiry(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, Denied> {
    let seller = auth.check_permission(&session, &[Role::Seller])?;
    let back = Role::Seller.dashboard_path();
    let Ok(next) = form.status.parse::<InquiryStatus>() else {
        return Ok(redirect_with(back, "invalid"));
    };

    let repo = state.repo.as_ref();
    if !Inquiry::set_status(repo, id, seller.user_id, next).await {
        return Ok(redirect_with(back, "not-allowed"));
    }
    if let Some(reply) = form.reply.as_deref() {
        send_reply(&state, &seller, id, reply).await;
    }
    Ok(redirect_with(back, "updated"))
}

async fn send_reply(state: &AppState, seller: &SessionData, inquiry_id: i64, reply: &str) {
    let repo = state.repo.as_ref();
    match Inquiry::find(repo, inquiry_id).await {
        Some(inquiry) => {
            let sent = Message::send(
                repo,
                seller.user_id,
                inquiry.buyer_id,
                Some(inquiry.property_id),
                reply,
            )
            .await;
            info!(inquiry_id, message_id = ?sent, "reply sent");
        }
        None => warn!(inquiry_id, "reply dropped: inquiry not found"),
    }
}

#[instrument(skip(state, auth, session))]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, Denied> {
    let admin = auth.check_permission(&session, &[Role::Admin])?;
    let repo = state.repo.as_ref();

    let users = User::list_all(repo).await;
    let reports = Report::list_open(repo).await;
    let listings = Property::search(repo, &Default::default()).await;

    let user_rows: String = users
        .iter()
        .map(|u| {
            let (next, label) = match u.status {
                UserStatus::Active => (UserStatus::Inactive, "Deactivate"),
                UserStatus::Inactive => (UserStatus::Active, "Activate"),
            };
            let action = if u.id == admin.user_id {
                String::new()
            } else {
                format!(
                    r#"<form method="post" action="/admin/users/{id}/status"><input type="hidden" name="status" value="{next}"><button type="submit">{label}</button></form>"#,
                    id = u.id,
                    next = next.as_str(),
                )
            };
            format!(
                "<tr><td>{name}</td><td>{email}</td><td>{role}</td><td>{status}</td><td>{last}</td><td>{action}</td></tr>",
                name = escape(&u.full_name),
                email = escape(&u.email),
                role = u.role,
                status = u.status.as_str(),
                last = u.last_login.map(format_date).unwrap_or_else(|| "never".to_string()),
            )
        })
        .collect();

    let report_rows: String = reports
        .iter()
        .map(|r| {
            let options: String = [ReportStatus::Reviewed, ReportStatus::Resolved, ReportStatus::Dismissed]
                .into_iter()
                .filter(|next| next.reachable_from().contains(&r.status.as_str()))
                .map(|next| format!(r#"<option value="{s}">{s}</option>"#, s = next.as_str()))
                .collect();
            format!(
                r#"<tr><td><a href="/properties/{pid}">{title}</a></td><td>{who}</td><td>{reason}</td><td>{details}</td><td>{status}</td>
                <td><form method="post" action="/admin/reports/{id}/status"><select name="status">{options}</select> <button type="submit">Apply</button></form></td></tr>"#,
                pid = r.property_id,
                title = escape(r.property_title.as_deref().unwrap_or("Listing")),
                who = escape(r.reporter_name.as_deref().unwrap_or("User")),
                reason = escape(&r.reason),
                details = escape(r.details.as_deref().unwrap_or("")),
                status = r.status.as_str(),
                id = r.id,
            )
        })
        .collect();

    let body = format!(
        r#"{flash}<h2>Administration</h2>
        <p>{listing_count} listings · {user_count} users · {report_count} open reports · data: {mode:?}</p>
        <h3>Open reports</h3>{reports}
        <h3>Users</h3><table><tr><th>Name</th><th>Email</th><th>Role</th><th>Status</th><th>Last login</th><th></th></tr>{user_rows}</table>"#,
        flash = flash(&query),
        listing_count = listings.len(),
        user_count = users.len(),
        report_count = reports.len(),
        mode = repo.mode(),
        reports = if reports.is_empty() {
            "<p>No open reports.</p>".to_string()
        } else {
            format!("<table><tr><th>Listing</th><th>Reporter</th><th>Reason</th><th>Details</th><th>Status</th><th></th></tr>{report_rows}</table>")
        },
    );
    Ok(views::layout("Admin dashboard", &session, &body))
}

#[instrument(skip(state, auth, session, form))]
pub async fn update_report(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, Denied> {
    auth.check_permission(&session, &[Role::Admin])?;
    let back = Role::Admin.dashboard_path();
    let Ok(next) = form.status.parse::<ReportStatus>() else {
        return Ok(redirect_with(back, "invalid"));
    };
    let code = if Report::set_status(state.repo.as_ref(), id, next).await {
        "updated"
    } else {
        "not-allowed"
    };
    Ok(redirect_with(back, code))
}

#[instrument(skip(auth, session, form))]
pub async fn update_user(
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, Denied> {
    let admin = auth.check_permission(&session, &[Role::Admin])?;
    let back = Role::Admin.dashboard_path();
    let Ok(status) = form.status.parse::<UserStatus>() else {
        return Ok(redirect_with(back, "invalid"));
    };
    if id == admin.user_id && status == UserStatus::Inactive {
        return Ok(redirect_with(back, "self"));
    }
    let code = if auth.set_user_status(id, status).await {
        "updated"
    } else {
        "not-allowed"
    };
    Ok(redirect_with(back, code))
}

#[instrument(skip(state, auth, session))]
pub async fn mark_messages_read(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
) -> Result<Redirect, Denied> {
    let user = auth.check_permission(&session, &[])?;
    let marked = Message::mark_all_read(state.repo.as_ref(), user.user_id).await;
    info!(user_id = user.user_id, marked, "messages marked read");
    Ok(redirect_with(user.user_role.dashboard_path(), "read"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn inquiry(status: InquiryStatus) -> Inquiry {
        Inquiry {
            id: 9,
            property_id: 1,
            buyer_id: 3,
            message: "Is it still available?".into(),
            status,
            created_at: datetime!(2024-03-01 10:00 UTC),
            property_title: None,
            buyer_name: None,
        }
    }

    #[test]
    fn inquiry_form_only_offers_reachable_states() {
        let fresh = inquiry_actions(&inquiry(InquiryStatus::New));
        assert!(fresh.contains(r#"value="responded""#));
        assert!(fresh.contains(r#"value="closed""#));

        let answered = inquiry_actions(&inquiry(InquiryStatus::Responded));
        assert!(!answered.contains(r#"value="responded""#));
        assert!(answered.contains(r#"value="closed""#));

        assert!(inquiry_actions(&inquiry(InquiryStatus::Closed)).is_empty());
    }

    #[test]
    fn unknown_notice_codes_render_nothing() {
        let q = DashboardQuery {
            notice: Some("<b>".into()),
        };
        assert!(flash(&q).is_empty());
        let q = DashboardQuery {
            notice: Some("updated".into()),
        };
        assert!(flash(&q).contains("Status updated."));
    }
}
