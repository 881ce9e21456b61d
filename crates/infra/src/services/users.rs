use std::sync::Arc;

use tracing::{info, instrument};

use shopfront_auth::{Actor, ProfileUpdate, Role, User, ensure_admin};
use shopfront_core::{DomainError, Page, PageRequest, UserId};

use crate::cache::CatalogCache;
use crate::services::ServiceResult;
use crate::store::{Store, UnitOfWork};

/// Local user records. Accounts are issued elsewhere; this keeps the profile
/// data that order and review projections show, plus the role and enabled
/// flag that gate every authenticated request.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    cache: Arc<CatalogCache>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<CatalogCache>) -> Self {
        Self { store, cache }
    }

    /// Insert a user, or refresh the email, name and role of an existing one.
    /// Emails are unique across users.
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    pub async fn provision(&self, user: User) -> ServiceResult<User> {
        let mut uow = self.store.begin().await?;
        ensure_email_free(uow.as_mut(), &user.email, user.id).await?;

        let user = match uow.get_user(user.id).await? {
            Some(mut existing) => {
                existing.email = user.email;
                existing.role = user.role;
                if user.display_name.is_some() {
                    existing.display_name = user.display_name;
                }
                existing
            }
            None => user,
        };
        uow.save_user(&user).await?;
        uow.commit().await?;
        info!(role = %user.role, "user provisioned");
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> ServiceResult<Option<User>> {
        let mut uow = self.store.begin().await?;
        Ok(uow.get_user(id).await?)
    }

    /// Resolve a validated token subject to the actor a request runs as.
    ///
    /// A known user acts with their stored role and is refused while
    /// disabled. A subject with no local record keeps the role its token
    /// claims.
    #[instrument(skip(self), err)]
    pub async fn authenticate(&self, subject: UserId, claimed: Role) -> ServiceResult<Actor> {
        let mut uow = self.store.begin().await?;
        match uow.get_user(subject).await? {
            Some(user) if !user.enabled => Err(DomainError::AccessDenied.into()),
            Some(user) => Ok(Actor::new(user.id, user.role)),
            None => Ok(Actor::new(subject, claimed)),
        }
    }

    pub async fn me(&self, actor: &Actor) -> ServiceResult<User> {
        let mut uow = self.store.begin().await?;
        load(uow.as_mut(), actor.user_id).await
    }

    #[instrument(skip(self, actor, update), fields(user_id = %actor.user_id), err)]
    pub async fn update_me(&self, actor: &Actor, update: ProfileUpdate) -> ServiceResult<User> {
        self.update(actor.user_id, update).await
    }

    /// All users, newest first.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn list(&self, actor: &Actor, page: PageRequest) -> ServiceResult<Page<User>> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        Ok(uow.list_users(page).await?)
    }

    pub async fn get_user(&self, actor: &Actor, id: UserId) -> ServiceResult<User> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        load(uow.as_mut(), id).await
    }

    #[instrument(skip(self, actor, update), fields(user_id = %actor.user_id, target = %id), err)]
    pub async fn update_user(&self, actor: &Actor, id: UserId, update: ProfileUpdate) -> ServiceResult<User> {
        ensure_admin(actor)?;
        self.update(id, update).await
    }

    /// Remove a user with their cart, wishlist and reviews. Users with orders
    /// are kept so order history stays attributable.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, target = %id), err)]
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> ServiceResult<()> {
        ensure_admin(actor)?;
        if actor.user_id == id {
            return Err(DomainError::validation("admins cannot delete their own account").into());
        }

        let mut uow = self.store.begin().await?;
        load(uow.as_mut(), id).await?;
        if uow.user_has_orders(id).await? {
            return Err(DomainError::conflict(format!("user {id} has orders")).into());
        }
        uow.delete_user(id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        info!("user deleted");
        Ok(())
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, target = %id), err)]
    pub async fn set_role(&self, actor: &Actor, id: UserId, role: Role) -> ServiceResult<User> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        let mut user = load(uow.as_mut(), id).await?;
        user.role = role;
        uow.save_user(&user).await?;
        uow.commit().await?;
        info!(%role, "user role changed");
        Ok(user)
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, target = %id), err)]
    pub async fn toggle_enabled(&self, actor: &Actor, id: UserId) -> ServiceResult<User> {
        ensure_admin(actor)?;
        if actor.user_id == id {
            return Err(DomainError::validation("admins cannot disable their own account").into());
        }

        let mut uow = self.store.begin().await?;
        let mut user = load(uow.as_mut(), id).await?;
        user.enabled = !user.enabled;
        uow.save_user(&user).await?;
        uow.commit().await?;
        info!(enabled = user.enabled, "user enabled flag toggled");
        Ok(user)
    }

    async fn update(&self, id: UserId, update: ProfileUpdate) -> ServiceResult<User> {
        let mut uow = self.store.begin().await?;
        let mut user = load(uow.as_mut(), id).await?;
        user.apply_update(update)?;
        ensure_email_free(uow.as_mut(), &user.email, id).await?;
        uow.save_user(&user).await?;
        uow.commit().await?;
        Ok(user)
    }
}

async fn load(uow: &mut dyn UnitOfWork, id: UserId) -> ServiceResult<User> {
    uow.get_user(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("user {id}")).into())
}

async fn ensure_email_free(uow: &mut dyn UnitOfWork, email: &str, owner: UserId) -> ServiceResult<()> {
    match uow.find_user_by_email(email).await? {
        Some(existing) if existing.id != owner => {
            Err(DomainError::conflict(format!("email {email} is already registered")).into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::test_support::Fixture;

    fn update(f: impl FnOnce(&mut ProfileUpdate)) -> ProfileUpdate {
        let mut update = ProfileUpdate::default();
        f(&mut update);
        update
    }

    #[tokio::test]
    async fn provision_upserts_and_guards_email() {
        let fx = Fixture::new();
        let id = UserId::new();
        let user = User::new(id, "Ada@Example.com", None, Role::Customer, Utc::now()).unwrap();
        fx.services.users.provision(user.clone()).await.unwrap();

        let renamed = User {
            display_name: Some("Ada".into()),
            ..user
        };
        fx.services.users.provision(renamed).await.unwrap();
        let stored = fx.services.users.get(id).await.unwrap().unwrap();
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.display_name.as_deref(), Some("Ada"));

        let clash = User::new(UserId::new(), "ada@example.com", None, Role::Customer, Utc::now()).unwrap();
        let err = fx.services.users.provision(clash).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn reprovisioning_keeps_profile_and_enabled_flag() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let user = fx.customer().await;
        fx.services
            .users
            .update_me(&user, update(|u| u.phone = Some("555-0100".into())))
            .await
            .unwrap();
        fx.services.users.toggle_enabled(&admin, user.user_id).await.unwrap();

        let again = User::new(user.user_id, &fx.email_of(&user), None, Role::Customer, Utc::now()).unwrap();
        fx.services.users.provision(again).await.unwrap();

        let stored = fx.services.users.get(user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("555-0100"));
        assert!(!stored.enabled);
    }

    #[tokio::test]
    async fn authenticate_uses_stored_role_and_refuses_disabled_users() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let user = fx.customer().await;

        let actor = fx.services.users.authenticate(user.user_id, Role::Admin).await.unwrap();
        assert_eq!(actor.role, Role::Customer);

        fx.services.users.set_role(&admin, user.user_id, Role::Admin).await.unwrap();
        let actor = fx.services.users.authenticate(user.user_id, Role::Customer).await.unwrap();
        assert_eq!(actor.role, Role::Admin);

        fx.services.users.toggle_enabled(&admin, user.user_id).await.unwrap();
        let err = fx.services.users.authenticate(user.user_id, Role::Admin).await.unwrap_err();
        assert_eq!(err.as_domain(), Some(&DomainError::AccessDenied));

        let stranger = UserId::new();
        let actor = fx.services.users.authenticate(stranger, Role::Customer).await.unwrap();
        assert_eq!(actor, Actor::customer(stranger));
    }

    #[tokio::test]
    async fn me_reads_and_updates_own_profile() {
        let fx = Fixture::new();
        let user = fx.customer().await;

        let updated = fx
            .services
            .users
            .update_me(
                &user,
                update(|u| {
                    u.display_name = Some("Ana".into());
                    u.address = Some("1 Main St".into());
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ana"));

        let me = fx.services.users.me(&user).await.unwrap();
        assert_eq!(me, updated);
        assert_eq!(me.address.as_deref(), Some("1 Main St"));

        let unknown = Actor::customer(UserId::new());
        let err = fx.services.users.me(&unknown).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn email_changes_cannot_take_another_users_address() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let ana = fx.customer().await;
        let bob = fx.customer().await;

        let taken = fx.email_of(&bob);
        let err = fx
            .services
            .users
            .update_user(&admin, ana.user_id, update(|u| u.email = Some(taken.to_uppercase())))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Conflict(_))));

        let stored = fx.services.users.get_user(&admin, ana.user_id).await.unwrap();
        assert_eq!(stored.email, fx.email_of(&ana));
    }

    #[tokio::test]
    async fn admin_operations_are_denied_to_customers() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let other = fx.customer().await;

        let denied = [
            fx.services.users.list(&user, PageRequest::default()).await.err(),
            fx.services.users.get_user(&user, other.user_id).await.err(),
            fx.services.users.set_role(&user, user.user_id, Role::Admin).await.err(),
            fx.services.users.toggle_enabled(&user, other.user_id).await.err(),
            fx.services.users.delete_user(&user, other.user_id).await.err(),
        ];
        for err in denied {
            assert_eq!(err.and_then(|e| e.as_domain().cloned()), Some(DomainError::AccessDenied));
        }
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let older = User::new(
            UserId::new(),
            "old@example.com",
            None,
            Role::Customer,
            Utc::now() - chrono::Duration::days(3),
        )
        .unwrap();
        fx.services.users.provision(older.clone()).await.unwrap();

        let page = fx.services.users.list(&admin, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.items[0].id, admin.user_id);
        assert_eq!(page.items[1].id, older.id);
    }

    #[tokio::test]
    async fn delete_cascades_but_refuses_users_with_orders() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let reviewer = fx.customer().await;
        let buyer = fx.customer().await;

        let lamp = fx.product("Lamp", "10", 5).await;
        fx.cart(&reviewer, &[(lamp, 1)]).await;
        fx.services.wishlist.add(&reviewer, lamp).await.unwrap();
        let review = shopfront_catalog::NewReview {
            product_id: lamp,
            rating: 4,
            comment: None,
        };
        fx.services.reviews.create(&reviewer, review).await.unwrap();
        fx.placed_order(&buyer, &[("Desk", "99", 5, 1)]).await;

        let err = fx.services.users.delete_user(&admin, buyer.user_id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Conflict(_))));

        let err = fx.services.users.delete_user(&admin, admin.user_id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));

        fx.services.users.delete_user(&admin, reviewer.user_id).await.unwrap();
        assert_eq!(fx.services.users.get(reviewer.user_id).await.unwrap(), None);

        let mut uow = fx.store.begin().await.unwrap();
        assert_eq!(uow.get_cart(reviewer.user_id).await.unwrap(), None);
        assert_eq!(uow.get_wishlist(reviewer.user_id).await.unwrap(), None);
        assert_eq!(uow.find_review(reviewer.user_id, lamp).await.unwrap(), None);
        drop(uow);

        let err = fx.services.users.delete_user(&admin, reviewer.user_id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
    }
}
