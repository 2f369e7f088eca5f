//! Command dispatch.
//!
//! Every command ends in exactly one reply. Errors are logged here, the
//! unexpected ones are also sent to Sentry, and each is turned into one
//! short message. Nothing is retried.

use tracing::{error, info, instrument, warn};

use super::parse::{Command, ParseError};
use super::replies;
use crate::catalog::{Catalog, CatalogError, Entity, Step};
use crate::error::add_breadcrumb;

/// An operator message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Incoming {
    /// Message text, or the caption of a photo.
    pub text: String,
    /// Downloadable URL of the attached photo, if any.
    pub image_url: Option<String>,
}

/// What the bot sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo { url: String, caption: String },
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The reply text, or the photo caption.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Photo { caption, .. } => caption,
        }
    }
}

/// Runs commands against a catalog.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    catalog: Catalog,
}

impl CommandRouter {
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Message to send before a slow command starts, if any.
    #[must_use]
    pub const fn acknowledgement(command: &Command, has_image: bool) -> Option<&'static str> {
        if command.needs_image() && has_image {
            Some(replies::UPLOADING_IMAGE)
        } else {
            None
        }
    }

    /// Reply to a message that did not parse.
    #[must_use]
    pub fn reject(error: &ParseError) -> Reply {
        parse_error_reply(error)
    }

    /// Parse and run one message.
    pub async fn handle(&self, incoming: &Incoming) -> Reply {
        match Command::parse(&incoming.text) {
            Ok(command) => self.dispatch(command, incoming.image_url.as_deref()).await,
            Err(e) => parse_error_reply(&e),
        }
    }

    /// Run an already parsed command.
    #[instrument(skip(self, command, image_url), fields(command = command.name()))]
    pub async fn dispatch(&self, command: Command, image_url: Option<&str>) -> Reply {
        let name = command.name();
        add_breadcrumb("command", name);

        if command.needs_image() && image_url.is_none() {
            return Reply::text(replies::IMAGE_REQUIRED);
        }

        match self.run(command, image_url.unwrap_or_default()).await {
            Ok(reply) => {
                info!(command = name, "Command completed");
                reply
            }
            Err(e) => {
                let message = failure_reply(name, &e);
                report(name, &e);
                Reply::text(message)
            }
        }
    }

    async fn run(&self, command: Command, image_url: &str) -> Result<Reply, CatalogError> {
        let catalog = &self.catalog;

        let reply = match command {
            Command::GetProduct(id) => {
                let view = catalog.get_product(id).await?;
                let caption = replies::product_caption(&view);
                match view.product.image_url {
                    Some(url) if !url.is_empty() => Reply::Photo { url, caption },
                    _ => Reply::Text(caption),
                }
            }
            Command::ChangePrice { id, pricing } => {
                let product = catalog.change_price(id, pricing).await?;
                Reply::Text(replies::price_updated(&product))
            }
            Command::ChangeName { id, name } => {
                let product = catalog.rename_product(id, &name).await?;
                Reply::Text(replies::name_updated(&product))
            }
            Command::ChangeCategory { id, category } => {
                let change = catalog.change_category(id, &category).await?;
                Reply::Text(replies::category_updated(id, change.category_name()))
            }
            Command::ChangeImage(id) => {
                catalog.change_image(id, image_url).await?;
                Reply::Text(replies::image_updated(id))
            }
            Command::AddProduct {
                category,
                pricing,
                name,
            } => {
                catalog
                    .add_product(image_url, &category, pricing, &name)
                    .await?;
                Reply::text(replies::PRODUCT_ADDED)
            }
            Command::SwapProductOrder(a, b) => {
                catalog.swap_product_order(a, b).await?;
                Reply::Text(replies::product_order_updated(a, b))
            }
            Command::DeleteProduct(id) => {
                catalog.delete_product(id).await?;
                Reply::Text(replies::product_deleted(id))
            }
            Command::ListCategories => {
                let categories = catalog.list_categories().await?;
                Reply::Text(replies::category_list(&categories))
            }
            Command::AddCategory { code, name } => {
                catalog.add_category(&code, &name).await?;
                Reply::text(replies::CATEGORY_ADDED)
            }
            Command::RenameCategory { id, name } => {
                let category = catalog.rename_category(id, &name).await?;
                Reply::Text(replies::category_name_updated(&category))
            }
            Command::SwapCategoryOrder(a, b) => {
                catalog.swap_category_order(a, b).await?;
                Reply::Text(replies::category_order_updated(a, b))
            }
            Command::ResetCategoryOrder => {
                let report = catalog.reset_category_order().await?;
                Reply::Text(replies::order_reset(&report))
            }
            Command::ListDeleted => {
                let products = catalog.list_deleted().await?;
                Reply::Text(replies::deleted_list(&products))
            }
            Command::RestoreProduct(id) => {
                catalog.restore_product(id).await?;
                Reply::Text(replies::product_restored(id))
            }
            Command::RefreshCategories => {
                catalog.refresh_categories().await?;
                Reply::text(replies::CATEGORIES_REFRESHED)
            }
            Command::RecountCategories => {
                let corrections = catalog.recount_categories().await?;
                Reply::Text(replies::recount(&corrections))
            }
            Command::Help => Reply::Text(replies::help()),
        };

        Ok(reply)
    }
}

fn parse_error_reply(error: &ParseError) -> Reply {
    let text = match error {
        ParseError::Usage { usage } => format!("Usage: {usage}"),
        ParseError::MissingProductId => replies::MISSING_PRODUCT_ID.to_string(),
        ParseError::InvalidProductId(_) => replies::INVALID_PRODUCT_ID.to_string(),
        ParseError::InvalidCategoryId(_) => replies::INVALID_CATEGORY_ID.to_string(),
        ParseError::InvalidPrice(_) => replies::INVALID_PRICE.to_string(),
        ParseError::InvalidCategoryCode(_) => replies::INVALID_CATEGORY.to_string(),
    };
    Reply::Text(text)
}

fn report(command: &str, error: &CatalogError) {
    if error.is_unexpected() {
        let event_id = sentry::capture_error(error);
        error!(
            command,
            error = %error,
            partial = error.is_partial(),
            sentry_event_id = %event_id,
            "Command failed"
        );
    } else {
        warn!(command, error = %error, "Command rejected");
    }
}

/// The message an operator sees for a failed command.
fn failure_reply(command: &str, error: &CatalogError) -> &'static str {
    match error {
        CatalogError::NotFound(Entity::Category(_)) => replies::CATEGORY_NOT_FOUND,
        CatalogError::NotFound(_) => replies::PRODUCT_NOT_FOUND,
        CatalogError::UnknownCategory(_) => replies::INVALID_CATEGORY,
        CatalogError::DuplicateCategory(_) => replies::CATEGORY_EXISTS,
        CatalogError::IdInUse(_) => replies::ID_IN_USE,
        CatalogError::Upload(_) => replies::UPLOAD_FAILED,
        CatalogError::Store { step, .. } | CatalogError::DependentStep { step, .. } => {
            if command == "cp" && error.is_invalid_input() {
                return replies::INVALID_PRICE;
            }
            step_failure_reply(command, *step)
        }
    }
}

fn step_failure_reply(command: &str, step: Step) -> &'static str {
    match (command, step) {
        (_, Step::FetchProduct | Step::FetchDeleted) => replies::FETCH_PRODUCT_FAILED,
        (_, Step::FetchCategory) => replies::FETCH_CATEGORY_FAILED,
        (_, Step::FetchCategories | Step::FetchProducts)
            if !matches!(command, "recount" | "updatecat") =>
        {
            replies::FETCH_CATEGORIES_FAILED
        }
        ("cp", _) => replies::UPDATE_PRICE_FAILED,
        ("cn", _) => replies::UPDATE_NAME_FAILED,
        ("ci", _) => replies::UPDATE_IMAGE_FAILED,
        ("add", Step::InsertProduct) => replies::ADD_PRODUCT_FAILED,
        ("add" | "cpc", _) => replies::UPDATE_CATEGORY_FAILED,
        ("cso", _) => replies::UPDATE_PRODUCT_ORDER_FAILED,
        ("delete", _) | ("restore", Step::RemoveDeleted) => replies::DELETE_FAILED,
        ("restore", _) => replies::RESTORE_FAILED,
        ("addcat", _) => replies::ADD_CATEGORY_FAILED,
        ("ccn", _) => replies::UPDATE_CATEGORY_NAME_FAILED,
        ("cco" | "resetco", _) => replies::UPDATE_CATEGORY_ORDER_FAILED,
        ("vdeleted", _) => replies::FETCH_DELETED_FAILED,
        ("updatecat", _) => replies::REFRESH_FAILED,
        _ => replies::RECOUNT_FAILED,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::testing::fixture;
    use crate::db::{Operation, Table};

    async fn router() -> (CommandRouter, crate::db::MemoryStore) {
        let (catalog, store, _) = fixture().await;
        (CommandRouter::new(catalog), store)
    }

    async fn say(router: &CommandRouter, text: &str) -> String {
        router
            .handle(&Incoming {
                text: text.to_string(),
                image_url: None,
            })
            .await
            .as_text()
            .to_string()
    }

    #[tokio::test]
    async fn test_get_sends_photo() {
        let (router, _) = router().await;
        let reply = router
            .handle(&Incoming {
                text: "/get 10".to_string(),
                image_url: None,
            })
            .await;

        assert_eq!(
            reply,
            Reply::Photo {
                url: "https://img/10.jpg".to_string(),
                caption: "Product ID: 10\nName: Mango\nCategory: Fruit - 1\nPrice: 20\nDiscounted Price: 10"
                    .to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_get_without_image_is_text() {
        let (router, _) = router().await;
        let reply = router
            .handle(&Incoming {
                text: "/get 12".to_string(),
                image_url: None,
            })
            .await;
        assert!(matches!(reply, Reply::Text(_)));
    }

    #[tokio::test]
    async fn test_parse_errors() {
        let (router, store) = router().await;
        assert_eq!(say(&router, "/get abc").await, replies::INVALID_PRODUCT_ID);
        assert_eq!(say(&router, "/cp 10 x").await, replies::INVALID_PRICE);
        assert_eq!(say(&router, "/cn 10").await, "Usage: /cn [product_id] [new_name]");
        assert_eq!(say(&router, "/ci").await, replies::MISSING_PRODUCT_ID);
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_image_commands_require_a_photo() {
        let (router, store) = router().await;
        assert_eq!(say(&router, "/ci 10").await, replies::IMAGE_REQUIRED);
        assert_eq!(say(&router, "/add 4 5 Fig").await, replies::IMAGE_REQUIRED);
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_with_image() {
        let (router, _) = router().await;
        let reply = router
            .handle(&Incoming {
                text: "/add 4 5 Fig".to_string(),
                image_url: Some("https://api.telegram.org/file/x.jpg".to_string()),
            })
            .await;
        assert_eq!(reply.as_text(), replies::PRODUCT_ADDED);
    }

    #[tokio::test]
    async fn test_store_failure_reply_depends_on_step() {
        let (router, store) = router().await;
        store.fail_next(Table::Categories, Operation::Upsert).await;

        let reply = router
            .handle(&Incoming {
                text: "/add 4 5 Fig".to_string(),
                image_url: Some("https://api.telegram.org/file/x.jpg".to_string()),
            })
            .await;
        assert_eq!(reply.as_text(), replies::UPDATE_CATEGORY_FAILED);

        store.fail_next(Table::Products, Operation::Upsert).await;
        assert_eq!(say(&router, "/cp 10 3").await, replies::UPDATE_PRICE_FAILED);
    }

    #[tokio::test]
    async fn test_category_replies() {
        let (router, _) = router().await;
        assert_eq!(say(&router, "/ccn 99 Name").await, replies::CATEGORY_NOT_FOUND);
        assert_eq!(say(&router, "/addcat 4 Dup").await, replies::CATEGORY_EXISTS);
        assert_eq!(
            say(&router, "/cco 1 2").await,
            "Order updated for category ID 1 and 2."
        );
        assert_eq!(say(&router, "/updatecat").await, replies::CATEGORIES_REFRESHED);
    }

    #[test]
    fn test_acknowledgement() {
        let add = Command::parse("/add 4 5 Fig").unwrap();
        assert_eq!(
            CommandRouter::acknowledgement(&add, true),
            Some(replies::UPLOADING_IMAGE)
        );
        assert_eq!(CommandRouter::acknowledgement(&add, false), None);
        assert_eq!(
            CommandRouter::acknowledgement(&Command::ListCategories, true),
            None
        );
    }

    #[test]
    fn test_step_failure_replies() {
        assert_eq!(
            step_failure_reply("restore", Step::RemoveDeleted),
            replies::DELETE_FAILED
        );
        assert_eq!(
            step_failure_reply("restore", Step::RestoreProduct),
            replies::RESTORE_FAILED
        );
        assert_eq!(
            step_failure_reply("resetco", Step::FetchCategories),
            replies::FETCH_CATEGORIES_FAILED
        );
        assert_eq!(
            step_failure_reply("recount", Step::FetchProducts),
            replies::RECOUNT_FAILED
        );
        assert_eq!(
            step_failure_reply("updatecat", Step::FetchCategories),
            replies::REFRESH_FAILED
        );
    }
}
