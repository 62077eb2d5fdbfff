use crate::db::{from_row, from_rows, Repository};
use crate::properties::repo_types::{Property, PropertyFilter, PropertyImage};

impl Property {
    /// Listings matching `filter`, featured first, newest first.
    pub async fn search(repo: &dyn Repository, filter: &PropertyFilter) -> Vec<Property> {
        let (clause, params) = filter.to_sql();
        let sql = format!(
            "SELECT p.* FROM properties p{clause} ORDER BY p.featured DESC, p.created_at DESC"
        );
        let rows: Vec<Property> = from_rows(repo.fetch_all(&sql, &params).await);
        rows.into_iter().filter(|p| filter.matches(p)).collect()
    }

    pub async fn find(repo: &dyn Repository, id: i64) -> Option<Property> {
        repo.fetch_one("SELECT p.* FROM properties p WHERE p.id = $1", &[id.into()])
            .await
            .and_then(from_row)
    }

    pub async fn list_by_seller(repo: &dyn Repository, seller_id: i64) -> Vec<Property> {
        let rows: Vec<Property> = from_rows(
            repo.fetch_all(
                "SELECT p.* FROM properties p WHERE p.seller_id = $1 ORDER BY p.created_at DESC",
                &[seller_id.into()],
            )
            .await,
        );
        rows.into_iter().filter(|p| p.seller_id == seller_id).collect()
    }

    /// Gallery for a listing, primary image first. Empty where the schema has
    /// no image table.
    pub async fn images(repo: &dyn Repository, property_id: i64) -> Vec<PropertyImage> {
        if !repo.table_exists("property_images").await {
            return Vec::new();
        }
        from_rows(
            repo.fetch_all(
                "SELECT id, property_id, image_url, is_primary FROM property_images \
                 WHERE property_id = $1 ORDER BY is_primary DESC, id",
                &[property_id.into()],
            )
            .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixture::FixtureRepository;
    use crate::properties::repo_types::ListingStatus;

    #[tokio::test]
    async fn demo_search_filters_in_memory() {
        let repo = FixtureRepository::new();

        let all = Property::search(&repo, &PropertyFilter::default()).await;
        assert_eq!(all.len(), 6);

        let chicago = PropertyFilter {
            city: Some("chicago".into()),
            ..Default::default()
        };
        let found = Property::search(&repo, &chicago).await;
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.city == "Chicago"));

        let big_cheap_houses = PropertyFilter {
            property_type: Some("House".into()),
            max_price: Some(400_000),
            bedrooms: Some(3),
            ..Default::default()
        };
        let titles: Vec<String> = Property::search(&repo, &big_cheap_houses)
            .await
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Lakeside Cottage", "Suburban Ranch"]);

        let keyword = PropertyFilter {
            q: Some("DOCK".into()),
            ..Default::default()
        };
        assert_eq!(Property::search(&repo, &keyword).await.len(), 1);
    }

    #[tokio::test]
    async fn demo_find_and_seller_listings() {
        let repo = FixtureRepository::new();
        let condo = Property::find(&repo, 4).await.expect("fixture listing");
        assert_eq!(condo.status, ListingStatus::Pending);
        assert!(Property::find(&repo, 404).await.is_none());

        assert_eq!(Property::list_by_seller(&repo, 2).await.len(), 6);
        assert!(Property::list_by_seller(&repo, 3).await.is_empty());
        assert!(Property::images(&repo, 1).await.is_empty());
    }
}
