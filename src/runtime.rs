//! Effects requested by the session and the background tasks that run them.
//!
//! The session never awaits. It queues [`Effect`]s; the loop spawns one task
//! per effect and each task sends exactly one [`Msg`] back on the channel.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::TaskClient;
use crate::bulk::{self, BulkOp, BulkReport};
use crate::error::ApiError;
use crate::model::{Comment, Item, ItemPatch, NewItem, Snapshot};

/// A remote call the session wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Snapshot,
    Items,
    Comments { item_id: String },
    /// Close or reopen one item. `undo` marks the inverse call of an undo.
    SetChecked { id: String, checked: bool, undo: bool },
    Delete { id: String },
    Create(NewItem),
    Update { id: String, patch: ItemPatch },
    Bulk { op: BulkOp, ids: Vec<String> },
    AddComment { item_id: String, text: String },
    CreateProject { name: String },
    DeleteProject { id: String },
    CreateSection { project_id: String, name: String },
    RenameSection { id: String, name: String },
    DeleteSection { id: String },
}

impl Request {
    /// Past-tense description used for status text on success.
    pub fn done_text(&self) -> &'static str {
        match self {
            Request::Snapshot | Request::Items | Request::Comments { .. } => "Loaded",
            Request::SetChecked { checked: true, .. } => "Completed",
            Request::SetChecked { checked: false, .. } => "Reopened",
            Request::Delete { .. } => "Deleted task",
            Request::Create(_) => "Added task",
            Request::Update { .. } => "Updated task",
            Request::Bulk { op, .. } => op.past_tense(),
            Request::AddComment { .. } => "Added comment",
            Request::CreateProject { .. } => "Added project",
            Request::DeleteProject { .. } => "Deleted project",
            Request::CreateSection { .. } => "Added section",
            Request::RenameSection { .. } => "Renamed section",
            Request::DeleteSection { .. } => "Deleted section",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Remote(Request),
    Clipboard { text: String, count: usize, bulk: bool },
}

/// Immutable result of one effect, processed by the loop in arrival order.
#[derive(Debug)]
pub enum Msg {
    Snapshot(Result<Snapshot, ApiError>),
    Items(Result<Vec<Item>, ApiError>),
    Comments {
        item_id: String,
        result: Result<Vec<Comment>, ApiError>,
    },
    Checked {
        id: String,
        checked: bool,
        undo: bool,
        result: Result<(), ApiError>,
    },
    Bulk(BulkReport),
    /// Any other mutation; `request` is echoed back for status text.
    Mutation {
        request: Request,
        result: Result<(), ApiError>,
    },
    Copied {
        count: usize,
        bulk: bool,
        result: Result<(), String>,
    },
}

/// Performs one request and wraps the outcome.
pub async fn execute(client: Arc<TaskClient>, request: Request) -> Msg {
    tracing::debug!(?request, "executing request");
    match request {
        Request::Snapshot => Msg::Snapshot(client.snapshot().await),
        Request::Items => Msg::Items(client.items().await),
        Request::Comments { item_id } => {
            let result = client.comments(&item_id).await;
            Msg::Comments { item_id, result }
        }
        Request::SetChecked { id, checked, undo } => {
            let result = if checked {
                client.close_item(&id).await
            } else {
                client.reopen_item(&id).await
            };
            Msg::Checked {
                id,
                checked,
                undo,
                result,
            }
        }
        Request::Bulk { op, ids } => Msg::Bulk(run_bulk(client, op, ids).await),
        other => {
            let result = mutate(&client, &other).await;
            Msg::Mutation {
                request: other,
                result,
            }
        }
    }
}

async fn mutate(client: &TaskClient, request: &Request) -> Result<(), ApiError> {
    match request {
        Request::Delete { id } => client.delete_item(id).await,
        Request::Create(item) => client.create_item(item).await.map(drop),
        Request::Update { id, patch } => client.update_item(id, patch).await.map(drop),
        Request::AddComment { item_id, text } => client.add_comment(item_id, text).await.map(drop),
        Request::CreateProject { name } => client.create_project(name).await.map(drop),
        Request::DeleteProject { id } => client.delete_project(id).await,
        Request::CreateSection { project_id, name } => {
            client.create_section(project_id, name).await.map(drop)
        }
        Request::RenameSection { id, name } => client.rename_section(id, name).await.map(drop),
        Request::DeleteSection { id } => client.delete_section(id).await,
        Request::Snapshot
        | Request::Items
        | Request::Comments { .. }
        | Request::SetChecked { .. }
        | Request::Bulk { .. } => Ok(()),
    }
}

async fn run_bulk(client: Arc<TaskClient>, op: BulkOp, ids: Vec<String>) -> BulkReport {
    bulk::run(op, ids, move |id| {
        let client = Arc::clone(&client);
        async move {
            let result = match op {
                BulkOp::Complete => client.close_item(&id).await,
                BulkOp::Uncomplete => client.reopen_item(&id).await,
                BulkOp::Delete => client.delete_item(&id).await,
            };
            if let Err(err) = &result {
                tracing::warn!(id = %id, op = op.past_tense(), error = %err, "bulk call failed");
            }
            result.is_ok()
        }
    })
    .await
}

fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new().map_err(|err| err.to_string())?;
    clipboard.set_text(text.to_string()).map_err(|err| err.to_string())
}

/// Spawns the task for one effect; its single message goes to `tx`.
pub fn spawn_effect(effect: Effect, client: Arc<TaskClient>, tx: mpsc::Sender<Msg>) {
    match effect {
        Effect::Remote(request) => {
            tokio::spawn(async move {
                let msg = execute(client, request).await;
                if tx.send(msg).await.is_err() {
                    tracing::debug!("event loop gone, dropping result");
                }
            });
        }
        Effect::Clipboard { text, count, bulk } => {
            tokio::spawn(async move {
                let result = tokio::task::spawn_blocking(move || copy_to_clipboard(&text))
                    .await
                    .unwrap_or_else(|err| Err(err.to_string()));
                let _ = tx.send(Msg::Copied { count, bulk, result }).await;
            });
        }
    }
}
