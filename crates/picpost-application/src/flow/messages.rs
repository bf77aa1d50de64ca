//! Outbound message builders for each wizard step.

use picpost_core::entry::{Entry, EntryField};
use picpost_core::error::{PicpostError, RemoteHostError, ValidationError};
use picpost_core::event::ActionId;
use picpost_core::notify::{Button, OutboundMessage};
use picpost_core::validation::CalendarDate;

fn entry_button(action: ActionId, label: &str, entry_id: u64) -> Button {
    Button::new(action, label).with_value(entry_id.to_string())
}

pub fn ask_date() -> OutboundMessage {
    OutboundMessage::interactive(
        "Got the image. When was it taken? Reply with YYYYMMDD or MMDD.",
        vec![
            Button::new(ActionId::Today, "Today"),
            Button::new(ActionId::Cancel, "Cancel"),
        ],
    )
}

pub fn ask_title(date: &CalendarDate) -> OutboundMessage {
    OutboundMessage::interactive(
        format!("Date set to {date}. What is the title? (\"no\" to leave it empty)"),
        vec![
            Button::new(ActionId::SkipTitle, "Skip"),
            Button::new(ActionId::Cancel, "Cancel"),
        ],
    )
}

pub fn ask_link(title: &str) -> OutboundMessage {
    let title = if title.is_empty() { "(none)" } else { title };
    OutboundMessage::interactive(
        format!("Title: {title}. Add a link, or post without one. (\"no\" to skip)"),
        vec![
            Button::new(ActionId::PostNow, "Post now"),
            Button::new(ActionId::Cancel, "Cancel"),
        ],
    )
}

/// The COMPLETED summary. Buttons carry the entry id so an expired session can be rebuilt.
pub fn summary(headline: &str, entry: &Entry) -> OutboundMessage {
    let title = if entry.title.is_empty() { "(none)" } else { &entry.title };
    let link = if entry.link.is_empty() { "(none)" } else { &entry.link };
    OutboundMessage::interactive(
        format!(
            "{headline}\n#{} | {} | {}\nLink: {}",
            entry.id, entry.date, title, link
        ),
        vec![
            entry_button(ActionId::Edit, "Edit", entry.id),
            entry_button(ActionId::Delete, "Delete", entry.id),
        ],
    )
}

pub fn choose_field(entry_id: u64) -> OutboundMessage {
    let mut buttons: Vec<Button> = EntryField::ALL
        .iter()
        .map(|field| entry_button(ActionId::EditField(*field), field_label(*field), entry_id))
        .collect();
    buttons.push(entry_button(ActionId::Cancel, "Cancel", entry_id));
    OutboundMessage::interactive(format!("Which field of entry #{entry_id}?"), buttons)
}

pub fn ask_field(field: EntryField, entry_id: u64) -> OutboundMessage {
    let (prompt, shortcut) = match field {
        EntryField::Date => ("Send the new date (YYYYMMDD or MMDD).", ActionId::Today),
        EntryField::Title => ("Send the new title.", ActionId::SkipTitle),
        EntryField::Link => ("Send the new link.", ActionId::SkipLink),
    };
    let shortcut_label = match field {
        EntryField::Date => "Today",
        _ => "Clear",
    };
    OutboundMessage::interactive(
        format!("Editing {} of entry #{entry_id}. {prompt}", field_label(field)),
        vec![
            entry_button(shortcut, shortcut_label, entry_id),
            entry_button(ActionId::Cancel, "Cancel", entry_id),
        ],
    )
}

pub fn edit_cancelled(entry_id: u64) -> OutboundMessage {
    OutboundMessage::interactive(
        format!("Edit cancelled. Entry #{entry_id} is unchanged."),
        vec![
            entry_button(ActionId::Edit, "Edit", entry_id),
            entry_button(ActionId::Delete, "Delete", entry_id),
        ],
    )
}

pub fn confirm_delete(entry_id: u64) -> OutboundMessage {
    OutboundMessage::interactive(
        format!("Delete entry #{entry_id} and its image?"),
        vec![
            entry_button(ActionId::ConfirmDelete, "Delete", entry_id),
            entry_button(ActionId::CancelDelete, "Keep", entry_id),
        ],
    )
}

pub fn delete_cancelled(entry_id: u64) -> OutboundMessage {
    OutboundMessage::text(format!("Kept entry #{entry_id}."))
}

pub fn deleted(entry_id: u64, committed: bool) -> OutboundMessage {
    if committed {
        OutboundMessage::good(format!("Deleted entry #{entry_id}."))
    } else {
        OutboundMessage::text(format!("Entry #{entry_id} was already removed."))
    }
}

pub fn entry_missing(entry_id: u64) -> OutboundMessage {
    OutboundMessage::warning(format!("Entry #{entry_id} no longer exists."))
}

pub fn upload_cancelled() -> OutboundMessage {
    OutboundMessage::text("Upload cancelled. Nothing was saved.")
}

pub fn invalid_input(error: &ValidationError) -> OutboundMessage {
    OutboundMessage::warning(format!("{error}. Please try again."))
}

pub fn unsupported_attachment(error: &ValidationError) -> OutboundMessage {
    OutboundMessage::warning(format!("{error}. Send a PNG, JPEG, GIF or WebP image."))
}

pub fn download_failed() -> OutboundMessage {
    OutboundMessage::danger(
        "Could not download the image. Nothing was saved; press Post now to try again.",
    )
}

/// A failed commit sequence. Before the ref update nothing became visible.
pub fn commit_failed(error: &RemoteHostError) -> OutboundMessage {
    let outcome = if error.step.is_before_ref_update() {
        "Nothing was saved."
    } else {
        "The repository may not reflect this change; check it before retrying."
    };
    OutboundMessage::danger(format!("Saving failed at {}. {outcome}\n{error}", error.step))
}

/// The data change went through but the session could not be written back.
pub fn saved_without_session(entry: &Entry) -> OutboundMessage {
    summary(
        "Saved, but this conversation could not be updated. The buttons below still work.",
        entry,
    )
}

pub fn unexpected_failure(error: &PicpostError) -> OutboundMessage {
    OutboundMessage::danger(format!("Something went wrong: {error}"))
}

fn field_label(field: EntryField) -> &'static str {
    match field {
        EntryField::Date => "Date",
        EntryField::Title => "Title",
        EntryField::Link => "Link",
    }
}
