//! Teacher discovery: filtering, sorting and pagination over teacher profiles.

use crate::error::BookingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TeacherProfile {
    pub id: String,
    pub name: String,
    /// Semicolon separated, e.g. `english;spanish`.
    pub languages: String,
    pub country: String,
    pub price: Decimal,
    pub rating: f64,
    pub reviews: u32,
    pub experience_years: u32,
    #[serde(default)]
    pub bio: String,
}

impl TeacherProfile {
    pub fn teaches(&self, language: &str) -> bool {
        self.languages
            .split(';')
            .any(|l| l.trim().eq_ignore_ascii_case(language))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum SortKey {
    #[default]
    #[serde(rename = "rating")]
    Rating,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
    #[serde(rename = "reviews")]
    Reviews,
    #[serde(rename = "experience")]
    Experience,
}

impl FromStr for SortKey {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rating" => Ok(Self::Rating),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "reviews" => Ok(Self::Reviews),
            "experience" => Ok(Self::Experience),
            other => Err(BookingError::ValidationError(format!(
                "unknown sort key: {other}"
            ))),
        }
    }
}

impl SortKey {
    fn compare(self, a: &TeacherProfile, b: &TeacherProfile) -> Ordering {
        match self {
            Self::Rating => b.rating.total_cmp(&a.rating),
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Reviews => b.reviews.cmp(&a.reviews),
            Self::Experience => b.experience_years.cmp(&a.experience_years),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct TeacherQuery {
    pub language: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<f64>,
    pub country: Option<String>,
    pub search: Option<String>,
    pub sort: SortKey,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl TeacherQuery {
    pub fn matches(&self, teacher: &TeacherProfile) -> bool {
        if let Some(language) = &self.language
            && !teacher.teaches(language)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| teacher.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| teacher.price > max) {
            return false;
        }
        if self.min_rating.is_some_and(|min| teacher.rating < min) {
            return false;
        }
        if let Some(country) = &self.country
            && !teacher.country.eq_ignore_ascii_case(country)
        {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase)
            && !teacher.name.to_lowercase().contains(&needle)
            && !teacher.bio.to_lowercase().contains(&needle)
        {
            return false;
        }
        true
    }

    /// Filters, sorts and slices out the requested 1-based page.
    pub fn apply<'a, I>(&self, teachers: I) -> Page<TeacherProfile>
    where
        I: IntoIterator<Item = &'a TeacherProfile>,
    {
        let mut hits: Vec<TeacherProfile> = teachers
            .into_iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();
        // Ties fall back to id so pages are stable.
        hits.sort_by(|a, b| self.sort.compare(a, b).then_with(|| a.id.cmp(&b.id)));

        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let total = hits.len();
        let items = hits
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Page {
            items,
            total,
            page,
            limit,
        }
    }
}
