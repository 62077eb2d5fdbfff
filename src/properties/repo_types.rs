use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::Param;
use crate::views::empty_as_none;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Pending,
    Sold,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Pending => "pending",
            ListingStatus::Sold => "sold",
        }
    }
}

/// Listing record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: i64,
    pub seller_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub property_type: String,
    pub status: ListingStatus,
    pub price: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub area_sqft: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyImage {
    pub id: i64,
    pub property_id: i64,
    pub image_url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Search criteria from the listing page's query string. Blank fields are absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_price: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_price: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub bedrooms: Option<i32>,
}

impl PropertyFilter {
    /// A ` WHERE ...` clause over alias `p` with its numbered parameters.
    /// Empty when no criterion is set.
    pub fn to_sql(&self) -> (String, Vec<Param>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Param> = Vec::new();
        let mut push = |template: &str, param: Param| {
            params.push(param);
            clauses.push(template.replace('?', &format!("${}", params.len())));
        };

        if let Some(q) = &self.q {
            push(
                "(p.title ILIKE ? OR p.description ILIKE ? OR p.address ILIKE ? OR p.city ILIKE ?)",
                format!("%{q}%").into(),
            );
        }
        if let Some(city) = &self.city {
            push("p.city ILIKE ?", city.as_str().into());
        }
        if let Some(kind) = &self.property_type {
            push("LOWER(p.property_type) = ?", kind.to_lowercase().into());
        }
        if let Some(min) = self.min_price {
            push("p.price >= ?", min.into());
        }
        if let Some(max) = self.max_price {
            push("p.price <= ?", max.into());
        }
        if let Some(beds) = self.bedrooms {
            push("p.bedrooms >= ?", beds.into());
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }

    /// Same criteria in memory, so rows that bypassed the WHERE clause still filter.
    pub fn matches(&self, p: &Property) -> bool {
        let contains = |hay: &str, needle: &str| hay.to_lowercase().contains(&needle.to_lowercase());

        let keyword = self.q.as_deref().map_or(true, |q| {
            contains(&p.title, q)
                || contains(&p.description, q)
                || contains(&p.address, q)
                || contains(&p.city, q)
        });
        let city = self.city.as_deref().map_or(true, |c| p.city.eq_ignore_ascii_case(c));
        let kind = self
            .property_type
            .as_deref()
            .map_or(true, |t| p.property_type.eq_ignore_ascii_case(t));

        keyword
            && city
            && kind
            && self.min_price.map_or(true, |min| p.price >= min)
            && self.max_price.map_or(true, |max| p.price <= max)
            && self.bedrooms.map_or(true, |b| p.bedrooms >= b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (sql, params) = PropertyFilter::default().to_sql();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        let filter = PropertyFilter {
            q: Some("loft".into()),
            min_price: Some(100_000),
            bedrooms: Some(2),
            ..Default::default()
        };
        let (sql, params) = filter.to_sql();
        assert_eq!(
            sql,
            " WHERE (p.title ILIKE $1 OR p.description ILIKE $1 OR p.address ILIKE $1 OR p.city ILIKE $1) \
             AND p.price >= $2 AND p.bedrooms >= $3"
        );
        assert_eq!(
            params,
            vec![Param::Text("%loft%".into()), Param::Int(100_000), Param::Int(2)]
        );
    }

    #[test]
    fn blank_query_fields_are_absent() {
        let uri: axum::http::Uri = "/properties?q=&city=%20&property_type=house&min_price=&bedrooms=3"
            .parse()
            .unwrap();
        let axum::extract::Query(filter) =
            axum::extract::Query::<PropertyFilter>::try_from_uri(&uri).expect("query parses");
        assert_eq!(filter.q, None);
        assert_eq!(filter.city, None);
        assert_eq!(filter.property_type.as_deref(), Some("house"));
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.bedrooms, Some(3));
    }
}
