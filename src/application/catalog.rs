use crate::domain::catalog::{Page, TeacherProfile, TeacherQuery};
use crate::domain::ports::TeacherDirectoryBox;
use crate::error::Result;

/// Teacher search backed by whatever directory holds the profiles.
pub struct Catalog {
    directory: TeacherDirectoryBox,
}

impl Catalog {
    pub fn new(directory: TeacherDirectoryBox) -> Self {
        Self { directory }
    }

    pub async fn search(&self, query: &TeacherQuery) -> Result<Page<TeacherProfile>> {
        let teachers = self.directory.all_teachers().await?;
        let page = query.apply(&teachers);
        tracing::debug!(total = page.total, page = page.page, "catalog search");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::SortKey;
    use crate::infrastructure::in_memory::InMemoryTeacherDirectory;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_search_through_directory() {
        let profile = |id: &str, price| TeacherProfile {
            id: id.into(),
            name: id.to_uppercase(),
            languages: "german".into(),
            country: "DE".into(),
            price,
            rating: 4.5,
            reviews: 10,
            experience_years: 3,
            bio: String::new(),
        };
        let catalog = Catalog::new(Box::new(InMemoryTeacherDirectory::new(vec![
            profile("x", dec!(30)),
            profile("y", dec!(20)),
        ])));

        let page = catalog
            .search(&TeacherQuery {
                language: Some("German".into()),
                sort: SortKey::PriceLow,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, "y");
    }
}
