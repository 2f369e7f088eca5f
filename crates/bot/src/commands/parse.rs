//! Command text parsing.
//!
//! The first whitespace-separated token names the command. It must start
//! with `/`; a trailing `@botname` is ignored, as is case. Names are the rest of
//! the tokens joined by single spaces.

use shelf_core::{
    CategoryCode, CategoryCodeError, CategoryId, PriceError, Pricing, ProductId,
};
use thiserror::Error;

/// One parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetProduct(ProductId),
    ChangePrice { id: ProductId, pricing: Pricing },
    ChangeName { id: ProductId, name: String },
    ChangeCategory { id: ProductId, category: CategoryCode },
    ChangeImage(ProductId),
    AddProduct {
        category: CategoryCode,
        pricing: Pricing,
        name: String,
    },
    SwapProductOrder(ProductId, ProductId),
    DeleteProduct(ProductId),
    ListCategories,
    AddCategory { code: CategoryCode, name: String },
    RenameCategory { id: CategoryId, name: String },
    SwapCategoryOrder(CategoryId, CategoryId),
    ResetCategoryOrder,
    ListDeleted,
    RestoreProduct(ProductId),
    RefreshCategories,
    RecountCategories,
    Help,
}

/// Why a command could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Required arguments are missing.
    #[error("missing arguments, usage: {usage}")]
    Usage { usage: &'static str },

    /// `ci` without a product id.
    #[error("missing product id")]
    MissingProductId,

    #[error("invalid product id '{0}'")]
    InvalidProductId(String),

    #[error("invalid category id '{0}'")]
    InvalidCategoryId(String),

    #[error(transparent)]
    InvalidPrice(#[from] PriceError),

    #[error("invalid category code: {0}")]
    InvalidCategoryCode(#[from] CategoryCodeError),
}

/// Name, argument usage and description of every command, in help order.
pub(crate) const COMMANDS: &[CommandInfo] = &[
    CommandInfo::product("get", "/get [product_id]", "Get product details"),
    CommandInfo::product("cp", "/cp [product_id] [new_price]", "Change product price"),
    CommandInfo::product("cn", "/cn [product_id] [new_name]", "Change product name"),
    CommandInfo::product(
        "cpc",
        "/cpc [product_id] [new_category]",
        "Change product category",
    ),
    CommandInfo::product("ci", "/ci [product_id]", "Change product image"),
    CommandInfo::product(
        "cso",
        "/cso [product_id] [swap_product_id]",
        "Change product sort order (swap location with another product)",
    ),
    CommandInfo::product("delete", "/delete [product_id]", "Delete product"),
    CommandInfo::category(
        "add",
        "/add [category] [price] [name]",
        "Add new product (with image)",
    ),
    CommandInfo::category("getcat", "/getcat", "Get category list"),
    CommandInfo::category(
        "addcat",
        "/addcat [category_letter] [category_name]",
        "Add new category",
    ),
    CommandInfo::category("ccn", "/ccn [category_id] [new_name]", "Change category name"),
    CommandInfo::category(
        "cco",
        "/cco [category_id] [swap_category_id]",
        "Change category order",
    ),
    CommandInfo::category("resetco", "/resetco", "Reset category order to default"),
    CommandInfo::deleted("vdeleted", "/vdeleted", "View deleted products"),
    CommandInfo::deleted("restore", "/restore [product_id]", "Restore deleted product"),
    CommandInfo::other("updatecat", "/updatecat", "Update local category list"),
    CommandInfo::other(
        "recount",
        "/recount",
        "Recount products in every category",
    ),
];

/// Help section a command is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Product,
    Category,
    Deleted,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandInfo {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub section: Section,
}

impl CommandInfo {
    const fn new(
        name: &'static str,
        usage: &'static str,
        description: &'static str,
        section: Section,
    ) -> Self {
        Self {
            name,
            usage,
            description,
            section,
        }
    }

    const fn product(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self::new(name, usage, description, Section::Product)
    }

    const fn category(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self::new(name, usage, description, Section::Category)
    }

    const fn deleted(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self::new(name, usage, description, Section::Deleted)
    }

    const fn other(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self::new(name, usage, description, Section::Other)
    }
}

fn usage(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|info| info.name == name)
        .map_or("", |info| info.usage)
}

/// Positional arguments of one command.
struct Args<'a> {
    name: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn require(&self, count: usize) -> Result<(), ParseError> {
        if self.tokens.len() < count {
            return Err(ParseError::Usage {
                usage: usage(self.name),
            });
        }
        Ok(())
    }

    fn get(&self, index: usize) -> Result<&'a str, ParseError> {
        self.tokens.get(index).copied().ok_or(ParseError::Usage {
            usage: usage(self.name),
        })
    }

    fn product_id(&self, index: usize) -> Result<ProductId, ParseError> {
        let raw = self.get(index)?;
        raw.parse()
            .map_err(|_| ParseError::InvalidProductId(raw.to_owned()))
    }

    fn category_id(&self, index: usize) -> Result<CategoryId, ParseError> {
        let raw = self.get(index)?;
        raw.parse()
            .map_err(|_| ParseError::InvalidCategoryId(raw.to_owned()))
    }

    fn category_code(&self, index: usize) -> Result<CategoryCode, ParseError> {
        Ok(CategoryCode::parse(self.get(index)?)?)
    }

    fn pricing(&self, index: usize) -> Result<Pricing, ParseError> {
        Ok(Pricing::parse_discounted(self.get(index)?)?)
    }

    /// Remaining tokens from `index` joined by single spaces.
    fn rest(&self, index: usize) -> Result<String, ParseError> {
        self.require(index + 1)?;
        Ok(self.tokens.get(index..).unwrap_or_default().join(" "))
    }
}

/// Command name of a message, without the leading `/` and `@botname`.
///
/// Text that does not start with `/` is not a command.
#[must_use]
pub fn command_name(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let first = first.strip_prefix('/')?;
    let name = first.split_once('@').map_or(first, |(name, _)| name);
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

impl Command {
    /// Parse a message text or photo caption.
    ///
    /// Unknown commands and empty text parse as [`Command::Help`].
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for missing or malformed arguments.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let Some(name) = command_name(text) else {
            return Ok(Self::Help);
        };
        let Some(info) = COMMANDS.iter().find(|info| info.name == name) else {
            return Ok(Self::Help);
        };

        let args = Args {
            name: info.name,
            tokens: text.split_whitespace().skip(1).collect(),
        };

        let command = match info.name {
            "get" => Self::GetProduct(args.product_id(0)?),
            "cp" => {
                args.require(2)?;
                Self::ChangePrice {
                    id: args.product_id(0)?,
                    pricing: args.pricing(1)?,
                }
            }
            "cn" => {
                let name = args.rest(1)?;
                Self::ChangeName {
                    id: args.product_id(0)?,
                    name,
                }
            }
            "cpc" => {
                args.require(2)?;
                Self::ChangeCategory {
                    id: args.product_id(0)?,
                    category: args.category_code(1)?,
                }
            }
            "ci" => {
                if args.tokens.is_empty() {
                    return Err(ParseError::MissingProductId);
                }
                Self::ChangeImage(args.product_id(0)?)
            }
            "add" => {
                let name = args.rest(2)?;
                Self::AddProduct {
                    category: args.category_code(0)?,
                    pricing: args.pricing(1)?,
                    name,
                }
            }
            "cso" => {
                args.require(2)?;
                Self::SwapProductOrder(args.product_id(0)?, args.product_id(1)?)
            }
            "delete" => Self::DeleteProduct(args.product_id(0)?),
            "getcat" => Self::ListCategories,
            "addcat" => {
                let name = args.rest(1)?;
                Self::AddCategory {
                    code: args.category_code(0)?,
                    name,
                }
            }
            "ccn" => {
                let name = args.rest(1)?;
                Self::RenameCategory {
                    id: args.category_id(0)?,
                    name,
                }
            }
            "cco" => {
                args.require(2)?;
                Self::SwapCategoryOrder(args.category_id(0)?, args.category_id(1)?)
            }
            "resetco" => Self::ResetCategoryOrder,
            "vdeleted" => Self::ListDeleted,
            "restore" => Self::RestoreProduct(args.product_id(0)?),
            "updatecat" => Self::RefreshCategories,
            "recount" => Self::RecountCategories,
            _ => Self::Help,
        };

        Ok(command)
    }

    /// Short command name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetProduct(_) => "get",
            Self::ChangePrice { .. } => "cp",
            Self::ChangeName { .. } => "cn",
            Self::ChangeCategory { .. } => "cpc",
            Self::ChangeImage(_) => "ci",
            Self::AddProduct { .. } => "add",
            Self::SwapProductOrder(..) => "cso",
            Self::DeleteProduct(_) => "delete",
            Self::ListCategories => "getcat",
            Self::AddCategory { .. } => "addcat",
            Self::RenameCategory { .. } => "ccn",
            Self::SwapCategoryOrder(..) => "cco",
            Self::ResetCategoryOrder => "resetco",
            Self::ListDeleted => "vdeleted",
            Self::RestoreProduct(_) => "restore",
            Self::RefreshCategories => "updatecat",
            Self::RecountCategories => "recount",
            Self::Help => "help",
        }
    }

    /// True for commands that need an attached image.
    #[must_use]
    pub const fn needs_image(&self) -> bool {
        matches!(self, Self::ChangeImage(_) | Self::AddProduct { .. })
    }
}
