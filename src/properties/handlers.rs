use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::CurrentSession,
        repo_types::Role,
        services::{AuthService, Denied},
    },
    inquiries::Inquiry,
    properties::{
        favorites,
        repo_types::{Property, PropertyFilter},
    },
    reports::Report,
    session::Session,
    state::AppState,
    views::{self, empty_as_none, escape, format_date, format_price},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/properties", get(list_properties))
        .route("/properties/:id", get(show_property))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/properties/:id/favorite", post(toggle_favorite))
        .route("/properties/:id/inquire", post(send_inquiry))
        .route("/properties/:id/report", post(report_property))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InquiryForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    reason: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    details: Option<String>,
}

/// Flash codes carried on the redirect back to a listing.
fn notice_text(code: &str) -> Option<(&'static str, bool)> {
    Some(match code {
        "favorited" => ("Saved to your favorites.", true),
        "unfavorited" => ("Removed from your favorites.", true),
        "favorite-failed" => ("Favorites are not available right now.", false),
        "inquiry-sent" => ("Your inquiry was sent to the seller.", true),
        "inquiry-empty" => ("Please write a message before sending.", false),
        "inquiry-failed" => ("Your inquiry could not be sent. Please try again later.", false),
        "reported" => ("Thank you. An administrator will review this listing.", true),
        "report-empty" => ("Please give a reason for the report.", false),
        "report-failed" => ("Your report could not be filed. Please try again later.", false),
        _ => return None,
    })
}

fn back_to(id: i64, code: &str) -> Redirect {
    Redirect::to(&format!("/properties/{id}?notice={code}"))
}

fn search_form(filter: &PropertyFilter) -> String {
    let text = |v: &Option<String>| v.as_deref().map(escape).unwrap_or_default();
    let num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
    let kind = filter.property_type.as_deref().unwrap_or("");
    let option = |value: &str, label: &str| {
        format!(
            r#"<option value="{value}"{sel}>{label}</option>"#,
            sel = if kind.eq_ignore_ascii_case(value) { " selected" } else { "" }
        )
    };
    format!(
        r#"<form method="get" action="/properties" class="card" style="display:flex;gap:.5rem;flex-wrap:wrap;margin-bottom:1rem">
        <input name="q" placeholder="Keyword" value="{q}">
        <input name="city" placeholder="City" value="{city}">
        <select name="property_type"><option value="">Any type</option>{types}</select>
        <input name="min_price" type="number" placeholder="Min $" value="{min}">
        <input name="max_price" type="number" placeholder="Max $" value="{max}">
        <input name="bedrooms" type="number" placeholder="Beds" value="{beds}">
        <button type="submit">Search</button></form>"#,
        q = text(&filter.q),
        city = text(&filter.city),
        types = ["house", "apartment", "condo", "land"]
            .into_iter()
            .map(|t| option(t, t))
            .collect::<String>(),
        min = num(filter.min_price),
        max = num(filter.max_price),
        beds = filter.bedrooms.map(|b| b.to_string()).unwrap_or_default(),
    )
}

#[instrument(skip(state, session))]
pub async fn list_properties(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<PropertyFilter>,
) -> Html<String> {
    let listings = Property::search(state.repo.as_ref(), &filter).await;

    let mut body = format!(
        "<h2>{count} listing{s}</h2>{form}",
        count = listings.len(),
        s = if listings.len() == 1 { "" } else { "s" },
        form = search_form(&filter),
    );
    if listings.is_empty() {
        body.push_str("<p>No listings match your search.</p>");
    } else {
        body.push_str(r#"<div class="grid">"#);
        for p in &listings {
            body.push_str(&views::property_card(p));
        }
        body.push_str("</div>");
    }
    views::layout("Listings", &session, &body)
}

async fn action_forms(state: &AppState, session: &Session, p: &Property) -> String {
    let Some(identity) = session.identity() else {
        return r#"<p><a href="/login">Log in</a> to save this listing or contact the seller.</p>"#
            .to_string();
    };
    let mut out = String::new();
    if identity.user_role == Role::Buyer {
        let saved = favorites::is_favorite(state.repo.as_ref(), identity.user_id, p.id).await;
        out.push_str(&format!(
            r#"<form method="post" action="/properties/{id}/favorite"><button type="submit">{label}</button></form>
            <form class="stack" method="post" action="/properties/{id}/inquire">
                <label for="message">Ask the seller</label>
                <textarea id="message" name="message" rows="3" required></textarea>
                <p><button type="submit">Send inquiry</button></p>
            </form>"#,
            id = p.id,
            label = if saved { "Remove from favorites" } else { "Save to favorites" },
        ));
    }
    out.push_str(&format!(
        r#"<details><summary>Report this listing</summary>
        <form class="stack" method="post" action="/properties/{id}/report">
            <label for="reason">Reason</label><input id="reason" name="reason" required>
            <label for="details">Details</label><textarea id="details" name="details" rows="2"></textarea>
            <p><button type="submit">Send report</button></p>
        </form></details>"#,
        id = p.id
    ));
    out
}

#[instrument(skip(state, session, query))]
pub async fn show_property(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> Response {
    let Some(p) = Property::find(state.repo.as_ref(), id).await else {
        return (StatusCode::NOT_FOUND, views::not_found(&session, "Listing")).into_response();
    };
    let images = Property::images(state.repo.as_ref(), id).await;

    let gallery: String = images
        .iter()
        .map(|img| {
            format!(
                r#"<img src="{src}" alt="" style="max-width:220px;border-radius:6px">"#,
                src = escape(&img.image_url)
            )
        })
        .chain(p.image_url.iter().filter(|_| images.is_empty()).map(|src| {
            format!(r#"<img src="{}" alt="" style="max-width:440px">"#, escape(src))
        }))
        .collect();

    let actions = action_forms(&state, &session, &p).await;
    let body = format!(
        r#"{notice}<div class="card">
        <div class="price">{price}</div><h2>{title}</h2>
        <p>{address}, {city}, {state} {zip}</p>
        <p>{beds} bedrooms · {baths} bathrooms · {sqft} sqft · <span class="badge">{kind}</span> <span class="badge">{status}</span></p>
        <div>{gallery}</div>
        <p>{description}</p>
        <p><small>Listed {listed}</small></p>
        {actions}</div>"#,
        notice = query
            .notice
            .as_deref()
            .and_then(notice_text)
            .map(|(m, ok)| views::notice(m, ok))
            .unwrap_or_default(),
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
        description = escape(&p.description),
        listed = format_date(p.created_at),
    );
    views::layout(&p.title, &session, &body).into_response()
}

#[instrument(skip(state, auth, session))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
) -> Result<Redirect, Denied> {
    let buyer = auth.check_permission(&session, &[Role::Buyer])?;
    let code = match favorites::toggle(state.repo.as_ref(), buyer.user_id, id).await {
        Some(true) => "favorited",
        Some(false) => "unfavorited",
        None => "favorite-failed",
    };
    Ok(back_to(id, code))
}

#[instrument(skip(state, auth, session, form))]
pub async fn send_inquiry(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Form(form): Form<InquiryForm>,
) -> Result<Response, Denied> {
    let buyer = auth.check_permission(&session, &[Role::Buyer])?;
    let message = form.message.trim();
    if message.is_empty() {
        return Ok(back_to(id, "inquiry-empty").into_response());
    }
    if Property::find(state.repo.as_ref(), id).await.is_none() {
        return Ok((StatusCode::NOT_FOUND, views::not_found(&session, "Listing")).into_response());
    }
    let code = match Inquiry::create(state.repo.as_ref(), id, buyer.user_id, message).await {
        Some(inquiry_id) => {
            info!(inquiry_id, property_id = id, buyer_id = buyer.user_id, "inquiry created");
            "inquiry-sent"
        }
        None => {
            warn!(property_id = id, "inquiry not stored");
            "inquiry-failed"
        }
    };
    Ok(back_to(id, code).into_response())
}

#[instrument(skip(state, auth, session, form))]
pub async fn report_property(
    State(state): State<AppState>,
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<i64>,
    Form(form): Form<ReportForm>,
) -> Result<Redirect, Denied> {
    let reporter = auth.check_permission(&session, &[])?;
    let reason = form.reason.trim();
    if reason.is_empty() {
        return Ok(back_to(id, "report-empty"));
    }
    let code = match Report::create(state.repo.as_ref(), reporter.user_id, id, reason, form.details)
        .await
    {
        Some(report_id) => {
            info!(report_id, property_id = id, "listing reported");
            "reported"
        }
        None => "report-failed",
    };
    Ok(back_to(id, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_redirect_code_has_text() {
        for code in [
            "favorited",
            "unfavorited",
            "favorite-failed",
            "inquiry-sent",
            "inquiry-empty",
            "inquiry-failed",
            "reported",
            "report-empty",
            "report-failed",
        ] {
            assert!(notice_text(code).is_some(), "{code}");
        }
        assert!(notice_text("<script>").is_none());
    }

    #[test]
    fn search_form_keeps_current_values() {
        let filter = PropertyFilter {
            q: Some("\"lake\"".into()),
            property_type: Some("Condo".into()),
            max_price: Some(300_000),
            ..Default::default()
        };
        let html = search_form(&filter);
        assert!(html.contains(r#"value="&quot;lake&quot;""#));
        assert!(html.contains(r#"<option value="condo" selected>"#));
        assert!(html.contains(r#"name="max_price" type="number" placeholder="Max $" value="300000""#));
    }
}
