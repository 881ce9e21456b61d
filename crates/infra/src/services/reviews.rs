use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use shopfront_auth::{Actor, ensure_owner, ensure_owner_or_admin};
use shopfront_catalog::{NewReview, Review, ReviewPatch};
use shopfront_core::{DomainError, Page, PageRequest, ProductId, ReviewId, UserId};

use crate::cache::CatalogCache;
use crate::services::ServiceResult;
use crate::services::catalog::existing_product;
use crate::store::{Store, UnitOfWork};
use crate::views::ReviewView;

/// Product reviews. Ratings feed the product projection, so changes drop
/// the cached catalog listings.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    cache: Arc<CatalogCache>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<CatalogCache>) -> Self {
        Self { store, cache }
    }

    pub async fn list_for_product(&self, product_id: ProductId, page: PageRequest) -> ServiceResult<Page<ReviewView>> {
        let mut uow = self.store.begin().await?;
        let reviews = uow.list_reviews(product_id, page).await?;

        let mut names = Vec::with_capacity(reviews.items.len());
        for review in &reviews.items {
            names.push(reviewer_name(uow.as_mut(), review.user_id).await?);
        }
        let mut names = names.into_iter();
        Ok(reviews.map(|review| ReviewView::new(&review, names.next().flatten())))
    }

    /// One review per user and product.
    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id, product_id = %input.product_id), err)]
    pub async fn create(&self, actor: &Actor, input: NewReview) -> ServiceResult<ReviewView> {
        let mut uow = self.store.begin().await?;
        existing_product(uow.as_mut(), input.product_id).await?;
        if uow.find_review(actor.user_id, input.product_id).await?.is_some() {
            return Err(DomainError::conflict("you have already reviewed this product").into());
        }

        let review = Review::create(ReviewId::new(), actor.user_id, input, Utc::now())?;
        uow.save_review(&review).await?;
        let name = reviewer_name(uow.as_mut(), actor.user_id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(ReviewView::new(&review, name))
    }

    #[instrument(skip(self, actor, patch), fields(user_id = %actor.user_id), err)]
    pub async fn update(&self, actor: &Actor, id: ReviewId, patch: ReviewPatch) -> ServiceResult<ReviewView> {
        let mut uow = self.store.begin().await?;
        let mut review = existing_review(uow.as_mut(), id).await?;
        ensure_owner(actor, review.user_id)?;

        review.apply_patch(patch)?;
        uow.save_review(&review).await?;
        let name = reviewer_name(uow.as_mut(), review.user_id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(ReviewView::new(&review, name))
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn delete(&self, actor: &Actor, id: ReviewId) -> ServiceResult<()> {
        let mut uow = self.store.begin().await?;
        let review = existing_review(uow.as_mut(), id).await?;
        ensure_owner_or_admin(actor, review.user_id)?;

        uow.delete_review(id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(())
    }
}

async fn existing_review(uow: &mut dyn UnitOfWork, id: ReviewId) -> ServiceResult<Review> {
    uow.get_review(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("review {id}")).into())
}

/// Display name, falling back to the email address.
async fn reviewer_name(uow: &mut dyn UnitOfWork, user_id: UserId) -> ServiceResult<Option<String>> {
    Ok(uow
        .get_user(user_id)
        .await?
        .map(|u| u.display_name.unwrap_or(u.email)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    fn five_stars(product_id: ProductId) -> NewReview {
        NewReview {
            product_id,
            rating: 5,
            comment: Some("great".into()),
        }
    }

    #[tokio::test]
    async fn one_review_per_user_and_product() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let lamp = fx.product("Lamp", "10", 1).await;

        let review = fx.services.reviews.create(&user, five_stars(lamp)).await.unwrap();
        assert_eq!(review.user_name.as_deref(), Some(fx.email_of(&user).as_str()));

        let err = fx.services.reviews.create(&user, five_stars(lamp)).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn rating_and_product_are_validated() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let lamp = fx.product("Lamp", "10", 1).await;

        let err = fx.services.reviews.create(&user, five_stars(ProductId::new())).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));

        let zero = NewReview {
            rating: 0,
            ..five_stars(lamp)
        };
        let err = fx.services.reviews.create(&user, zero).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn only_the_author_edits_and_admins_may_delete() {
        let fx = Fixture::new();
        let author = fx.customer().await;
        let other = fx.customer().await;
        let admin = fx.admin().await;
        let lamp = fx.product("Lamp", "10", 1).await;
        let review = fx.services.reviews.create(&author, five_stars(lamp)).await.unwrap();

        let patch = ReviewPatch {
            rating: Some(3),
            comment: None,
        };
        let err = fx.services.reviews.update(&admin, review.id, patch.clone()).await.unwrap_err();
        assert_eq!(err.as_domain(), Some(&DomainError::AccessDenied));
        let updated = fx.services.reviews.update(&author, review.id, patch).await.unwrap();
        assert_eq!(updated.rating, 3);

        let err = fx.services.reviews.delete(&other, review.id).await.unwrap_err();
        assert_eq!(err.as_domain(), Some(&DomainError::AccessDenied));
        fx.services.reviews.delete(&admin, review.id).await.unwrap();

        let listed = fx
            .services
            .reviews
            .list_for_product(lamp, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total_elements, 0);
    }
}
