use crate::bulk::BulkOp;
use crate::error::ApiError;
use crate::model::{Item, Snapshot};
use crate::runtime::{Msg, Request};

use super::{App, UndoRecord};

impl App {
    /// Folds one background result into the session.
    pub fn handle_msg(&mut self, msg: Msg) {
        self.pending = self.pending.saturating_sub(1);
        match msg {
            Msg::Snapshot(Ok(snapshot)) => self.apply_snapshot(snapshot),
            Msg::Snapshot(Err(err)) => {
                self.announce_sync = false;
                self.remote_failed("Sync failed", &err);
            }
            Msg::Items(Ok(items)) => self.set_items(items),
            Msg::Items(Err(err)) => self.remote_failed("Reload failed", &err),
            Msg::Comments { item_id, result } => {
                if self.comments_for.as_deref() != Some(item_id.as_str()) {
                    tracing::debug!(%item_id, "discarding comments for a closed detail view");
                    return;
                }
                match result {
                    Ok(mut comments) => {
                        comments.sort_by(|a, b| a.posted.cmp(&b.posted));
                        self.comments = comments;
                    }
                    Err(err) => self.remote_failed("Loading comments failed", &err),
                }
            }
            Msg::Checked {
                id,
                checked,
                undo,
                result,
            } => self.checked_done(id, checked, undo, result),
            Msg::Bulk(report) => {
                if report.all_succeeded() {
                    self.info(report.message());
                } else {
                    self.warn(report.message());
                }
                tracing::info!(
                    op = report.op.past_tense(),
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "bulk operation finished"
                );
                // Complete/uncomplete keep the selection for chained actions.
                if report.op == BulkOp::Delete {
                    self.selection.clear();
                }
                self.request(Request::Items);
            }
            Msg::Mutation { request, result } => match result {
                Ok(()) => self.mutation_done(request),
                Err(err) => {
                    if matches!(request, Request::Update { .. }) {
                        // Undo the optimistic edit by reloading.
                        self.request(Request::Items);
                    }
                    self.remote_failed(failure_context(&request), &err);
                }
            },
            Msg::Copied {
                count,
                bulk,
                result,
            } => match result {
                Ok(()) => {
                    if bulk {
                        self.selection.clear();
                    }
                    let noun = if count == 1 { "item" } else { "items" };
                    self.info(format!("Copied {count} {noun}"));
                }
                Err(err) => self.error(format!("Clipboard unavailable: {err}")),
            },
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let Snapshot {
            items,
            mut projects,
            sections,
            mut labels,
        } = snapshot;
        projects.sort_by_key(|project| (!project.inbox, !project.favorite, project.order));
        labels.sort_by_key(|label| (!label.favorite, label.order));

        if let Some(open) = self.nav.project().map(str::to_string) {
            match projects.iter().position(|project| project.id == open) {
                Some(pos) => self.sidebar_cursor = pos,
                None => self.nav.set_project(None),
            }
        }
        tracing::info!(
            items = items.len(),
            projects = projects.len(),
            sections = sections.len(),
            labels = labels.len(),
            "snapshot loaded"
        );

        if std::mem::take(&mut self.announce_sync) {
            self.info(format!(
                "Synced {} tasks in {} projects",
                items.len(),
                projects.len()
            ));
        }
        self.projects = projects;
        self.sections = sections;
        self.labels = labels;
        self.loaded = true;
        self.set_items(items);
        self.sync_project();
    }

    fn set_items(&mut self, items: Vec<Item>) {
        self.items = items;
        self.rebuild();
        let dropped = self.drop_stale_selection();
        if dropped > 0 {
            let noun = if dropped == 1 { "entry" } else { "entries" };
            let text = format!(
                "{}; dropped {dropped} stale selection {noun}",
                self.status.text
            );
            self.warn(text);
        }
    }

    fn checked_done(
        &mut self,
        id: String,
        checked: bool,
        undo: bool,
        result: Result<(), ApiError>,
    ) {
        let reverted = if undo { self.undoing.take() } else { None };
        let name = self
            .item(&id)
            .map(|item| item.content.clone())
            .or_else(|| reverted.map(|record| record.content))
            .unwrap_or_default();
        match result {
            Ok(()) => {
                let verb = if checked { "Completed" } else { "Reopened" };
                if undo {
                    self.info(format!("Undone: {} {name:?}", verb.to_lowercase()));
                } else {
                    self.undo = Some(UndoRecord {
                        item_id: id,
                        content: name.clone(),
                        completed: checked,
                    });
                    self.info(format!("{verb} {name:?} (u to undo)"));
                }
                self.request(Request::Items);
            }
            Err(err) => {
                self.set_checked_locally(&id, !checked);
                let context = if checked {
                    "Completing failed"
                } else {
                    "Reopening failed"
                };
                self.remote_failed(context, &err);
            }
        }
    }

    fn mutation_done(&mut self, request: Request) {
        tracing::info!(?request, "mutation applied");
        let text = request.done_text();
        match &request {
            Request::DeleteProject { id } => {
                if self.nav.project() == Some(id.as_str()) {
                    self.nav.set_project(None);
                }
                self.request(Request::Snapshot);
            }
            Request::CreateProject { .. }
            | Request::CreateSection { .. }
            | Request::RenameSection { .. }
            | Request::DeleteSection { .. } => self.request(Request::Snapshot),
            Request::AddComment { item_id, .. } => {
                if self.comments_for.as_deref() == Some(item_id.as_str()) {
                    self.request(Request::Comments {
                        item_id: item_id.clone(),
                    });
                }
                self.request(Request::Items);
            }
            _ => self.request(Request::Items),
        }
        self.info(text);
    }

    fn remote_failed(&mut self, context: &str, err: &ApiError) {
        let hint = if err.is_unauthorized() {
            " (token rejected; run `tasklane login`)"
        } else {
            ""
        };
        self.error(format!("{context}: {err}{hint}"));
    }
}

fn failure_context(request: &Request) -> &'static str {
    match request {
        Request::Delete { .. } => "Deleting task failed",
        Request::Create(_) => "Adding task failed",
        Request::Update { .. } => "Saving task failed",
        Request::AddComment { .. } => "Adding comment failed",
        Request::CreateProject { .. } => "Adding project failed",
        Request::DeleteProject { .. } => "Deleting project failed",
        Request::CreateSection { .. } => "Adding section failed",
        Request::RenameSection { .. } => "Renaming section failed",
        Request::DeleteSection { .. } => "Deleting section failed",
        Request::Snapshot
        | Request::Items
        | Request::Comments { .. }
        | Request::SetChecked { .. }
        | Request::Bulk { .. } => "Request failed",
    }
}
