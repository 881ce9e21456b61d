use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, Entity, ProductId, ReviewId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

fn validate_rating(rating: u8) -> DomainResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

impl Review {
    pub fn create(
        id: ReviewId,
        user_id: UserId,
        input: NewReview,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_rating(input.rating)?;
        Ok(Self {
            id,
            product_id: input.product_id,
            user_id,
            rating: input.rating,
            comment: input.comment,
            created_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: ReviewPatch) -> DomainResult<()> {
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
            self.rating = rating;
        }
        if let Some(comment) = patch.comment {
            self.comment = Some(comment);
        }
        Ok(())
    }
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Mean rating rounded to one decimal place; `0.0` when there are no reviews.
pub fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(*r)).sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
        assert_eq!(average_rating(&[5, 4]), 4.5);
        assert_eq!(average_rating(&[1, 2, 2]), 1.7);
    }

    #[test]
    fn rating_must_be_one_to_five() {
        let input = |rating| NewReview { product_id: ProductId::new(), rating, comment: None };
        assert!(Review::create(ReviewId::new(), UserId::new(), input(0), Utc::now()).is_err());
        assert!(Review::create(ReviewId::new(), UserId::new(), input(6), Utc::now()).is_err());
        assert!(Review::create(ReviewId::new(), UserId::new(), input(5), Utc::now()).is_ok());
    }

    #[test]
    fn patch_rejects_bad_rating() {
        let mut review = Review::create(
            ReviewId::new(),
            UserId::new(),
            NewReview { product_id: ProductId::new(), rating: 3, comment: None },
            Utc::now(),
        )
        .unwrap();
        assert!(review.apply_patch(ReviewPatch { rating: Some(9), comment: None }).is_err());
        assert_eq!(review.rating, 3);
    }
}
