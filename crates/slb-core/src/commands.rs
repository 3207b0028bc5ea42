//! Command parsing and handling.
//!
//! Parsing is a separate step that yields a [`Command`] variant, so the
//! handler's dispatch is an exhaustive `match` and "unknown command" is one
//! arm of the parser rather than a fallthrough in string matching.

use std::sync::Arc;

use crate::{
    domain::OwnerId,
    errors::Error,
    formatting::{escape_html, render_items, render_summaries},
    store::ListStore,
    Result,
};

/// One inbound chat command. Grammar: `/cmd arg, arg, ...` with
/// comma-separated arguments, so list and item names may contain spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    NewList { name: String },
    DropList { name: String },
    RenameList { name: String, new_name: String },
    Add { list: String, item: String, quantity: String },
    Remove { list: String, item: String },
    MarkPurchased { list: String, item: String, purchased: bool },
    Clear { list: String },
    Show { list: String },
    Lists,
}

/// Parse raw message text into a [`Command`].
///
/// Accepts the Telegram group convention `/cmd@botname`. Command names are
/// case-insensitive. Anything that is not a known command is
/// `Error::UnrecognizedCommand`, which the handler renders as help.
pub fn parse_command(text: &str) -> Result<Command> {
    let (cmd, args) = split_command(text)?;

    match cmd.as_str() {
        "start" | "help" => Ok(Command::Help),
        "newlist" => Ok(Command::NewList {
            name: one_arg(&args, "/newlist Groceries")?,
        }),
        "droplist" => Ok(Command::DropList {
            name: one_arg(&args, "/droplist Groceries")?,
        }),
        "renamelist" => {
            let [name, new_name] = two_args(&args, "/renamelist Groceries, Weekly")?;
            Ok(Command::RenameList { name, new_name })
        }
        "add" => {
            let (list, item, quantity) = add_args(&args)?;
            Ok(Command::Add { list, item, quantity })
        }
        "remove" => {
            let [list, item] = two_args(&args, "/remove Groceries, Milk")?;
            Ok(Command::Remove { list, item })
        }
        "bought" => {
            let [list, item] = two_args(&args, "/bought Groceries, Milk")?;
            Ok(Command::MarkPurchased {
                list,
                item,
                purchased: true,
            })
        }
        "unbought" => {
            let [list, item] = two_args(&args, "/unbought Groceries, Milk")?;
            Ok(Command::MarkPurchased {
                list,
                item,
                purchased: false,
            })
        }
        "clear" => Ok(Command::Clear {
            list: one_arg(&args, "/clear Groceries")?,
        }),
        "show" => Ok(Command::Show {
            list: one_arg(&args, "/show Groceries")?,
        }),
        "lists" => Ok(Command::Lists),
        other => Err(Error::UnrecognizedCommand(other.to_string())),
    }
}

fn split_command(text: &str) -> Result<(String, String)> {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Err(Error::UnrecognizedCommand(first_word(trimmed)));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim().to_string();

    // Telegram may send `/cmd@botname arg ...` in groups.
    let cmd = head.split('@').next().unwrap_or("").to_lowercase();
    if cmd.is_empty() {
        return Err(Error::UnrecognizedCommand(first_word(trimmed)));
    }
    Ok((cmd, args))
}

fn first_word(text: &str) -> String {
    text.split_whitespace().next().unwrap_or("").to_string()
}

fn split_args(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return Vec::new();
    }
    args.split(',').map(|a| a.trim().to_string()).collect()
}

fn usage(example: &str) -> Error {
    Error::InvalidInput(format!("usage: {example}"))
}

fn one_arg(args: &str, example: &str) -> Result<String> {
    match split_args(args).as_slice() {
        [a] if !a.is_empty() => Ok(a.clone()),
        _ => Err(usage(example)),
    }
}

fn two_args(args: &str, example: &str) -> Result<[String; 2]> {
    match split_args(args).as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Ok([a.clone(), b.clone()]),
        _ => Err(usage(example)),
    }
}

fn add_args(args: &str) -> Result<(String, String, String)> {
    const EXAMPLE: &str = "/add Groceries, Milk, 2";
    match split_args(args).as_slice() {
        [list, item] if !list.is_empty() && !item.is_empty() => {
            Ok((list.clone(), item.clone(), "1".to_string()))
        }
        [list, item, qty] if !list.is_empty() && !item.is_empty() && !qty.is_empty() => {
            Ok((list.clone(), item.clone(), qty.clone()))
        }
        _ => Err(usage(EXAMPLE)),
    }
}

/// Maps one parsed command to exactly one store call and renders the reply.
///
/// The store is injected so tests can run against isolated instances.
pub struct CommandHandler {
    store: Arc<ListStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }

    /// Handle one inbound message and produce the reply. Never fails: every
    /// error kind becomes a user-facing message at this boundary.
    pub async fn handle(&self, owner: OwnerId, text: &str) -> String {
        let cmd = match parse_command(text) {
            Ok(cmd) => cmd,
            Err(err) => return render_error(&err),
        };
        match self.execute(owner, cmd).await {
            Ok(reply) => reply,
            Err(err) => render_error(&err),
        }
    }

    async fn execute(&self, owner: OwnerId, cmd: Command) -> Result<String> {
        match cmd {
            Command::Help => Ok(help_text()),

            Command::NewList { name } => {
                self.store.create_list(owner, &name).await?;
                Ok(format!("🆕 Created list <b>{}</b>.", escape_html(name.trim())))
            }

            Command::DropList { name } => {
                self.store.delete_list(owner, &name).await?;
                Ok(format!(
                    "🗑 Deleted <b>{}</b> and everything on it.",
                    escape_html(name.trim())
                ))
            }

            Command::RenameList { name, new_name } => {
                self.store.rename_list(owner, &name, &new_name).await?;
                Ok(format!(
                    "✏️ Renamed <b>{}</b> to <b>{}</b>.",
                    escape_html(name.trim()),
                    escape_html(new_name.trim())
                ))
            }

            Command::Add { list, item, quantity } => {
                let updated = self.store.add_item(owner, &list, &item, &quantity).await?;
                let item = escape_html(item.trim());
                let list = escape_html(list.trim());
                let quantity = escape_html(quantity.trim());
                Ok(if updated {
                    format!("✏️ <b>{item}</b> is already on <b>{list}</b> — quantity set to {quantity}.")
                } else {
                    format!("➕ Added <b>{item}</b> ({quantity}) to <b>{list}</b>.")
                })
            }

            Command::Remove { list, item } => {
                self.store.remove_item(owner, &list, &item).await?;
                Ok(format!(
                    "➖ Removed <b>{}</b> from <b>{}</b>.",
                    escape_html(item.trim()),
                    escape_html(list.trim())
                ))
            }

            Command::MarkPurchased { list, item, purchased } => {
                let item = self.store.mark_purchased(owner, &list, &item, purchased).await?;
                Ok(if purchased {
                    format!("✅ <b>{}</b> checked off.", escape_html(&item.name))
                } else {
                    format!("⬜ <b>{}</b> is back on the list.", escape_html(&item.name))
                })
            }

            Command::Clear { list } => {
                let removed = self.store.clear_purchased(owner, &list).await?;
                let list = escape_html(list.trim());
                Ok(match removed {
                    0 => format!("Nothing bought on <b>{list}</b> yet — nothing to clear."),
                    1 => format!("🧹 Cleared 1 bought item from <b>{list}</b>."),
                    n => format!("🧹 Cleared {n} bought items from <b>{list}</b>."),
                })
            }

            Command::Show { list } => {
                // Render under the canonical stored name, whatever the user typed.
                let list = self.store.get_list(owner, &list).await?;
                Ok(render_items(&list.name, &list.items))
            }

            Command::Lists => {
                let summaries = self.store.list_all(owner).await;
                Ok(render_summaries(&summaries))
            }
        }
    }
}

fn render_error(err: &Error) -> String {
    match err {
        Error::DuplicateList(name) => format!(
            "❌ You already have a list called <b>{}</b>.",
            escape_html(name)
        ),
        Error::NotFound(what) => format!("❌ Could not find {}.", escape_html(what)),
        Error::InvalidInput(msg) => format!("⚠️ {}", escape_html(msg)),
        Error::UnrecognizedCommand(_) => help_text(),
        other => {
            tracing::error!(error = %other, "command failed");
            "🚨 Something went wrong on my side. Please try again.".to_string()
        }
    }
}

fn help_text() -> String {
    "🛒 <b>Shopping List Bot</b>\n\n\
<b>📋 Commands:</b>\n\
/newlist name - Create a list\n\
/droplist name - Delete a list and its items\n\
/renamelist name, new name - Rename a list\n\
/add list, item, quantity - Add an item (quantity optional)\n\
/remove list, item - Remove an item\n\
/bought list, item - Check an item off\n\
/unbought list, item - Put an item back\n\
/clear list - Drop everything already bought\n\
/show list - Show a list\n\
/lists - Show all your lists\n\
/help - Show this message\n\n\
<b>💡 Tips:</b>\n\
• Names may contain spaces; separate arguments with commas\n\
• Quantity is free text: 2, 500g, 1 bag\n\
• Re-adding an item updates its quantity"
        .to_string()
}
