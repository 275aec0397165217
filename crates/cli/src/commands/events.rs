// Agenda management commands

use anyhow::{bail, Result};
use chrono::Utc;
use ctfnotify_core::{EventRecord, OwnerId};
use serde_json::json;

use crate::agenda::{AddOutcome, AgendaService, CustomEvent, ShareOutcome};
use crate::output::{format_time, print_field, print_table_header, print_table_row, OutputFormat};

fn print_added(output: OutputFormat, quiet: bool, outcome: &AddOutcome) -> Result<()> {
    match outcome {
        AddOutcome::Added(record) => {
            if output.is_text() {
                if !quiet {
                    println!("Added {} to your agenda.", record.name);
                    print_field("Start", &format_time(record.start_time));
                    print_field("End", &format_time(record.end_time));
                }
            } else {
                output.print_value(&json!({ "status": "added", "event": record }))?;
            }
        }
        AddOutcome::AlreadyExists(name) => {
            if output.is_text() {
                println!("{} is already in your agenda.", name);
            } else {
                output.print_value(&json!({ "status": "already_exists", "name": name }))?;
            }
        }
    }
    Ok(())
}

pub async fn add(
    service: &AgendaService,
    output: OutputFormat,
    quiet: bool,
    owner: OwnerId,
    url: &str,
) -> Result<()> {
    let outcome = service.add_from_url(owner, url, Utc::now()).await?;
    print_added(output, quiet, &outcome)
}

pub async fn custom(
    service: &AgendaService,
    output: OutputFormat,
    quiet: bool,
    owner: OwnerId,
    event: CustomEvent,
) -> Result<()> {
    let outcome = service.add_custom(owner, event).await?;
    print_added(output, quiet, &outcome)
}

pub async fn list(service: &AgendaService, output: OutputFormat, owner: OwnerId) -> Result<()> {
    let events = service.list(owner).await?;

    if !output.is_text() {
        return output.print_value(&events);
    }

    if events.is_empty() {
        println!("Your agenda is empty. Use `ctfnotify add` to add events.");
        return Ok(());
    }

    print_table_header(&[("NAME", 32), ("START", 20), ("END", 20)]);
    for event in &events {
        let start = format_time(event.start_time);
        let end = format_time(event.end_time);
        print_table_row(&[(event.name.as_str(), 32), (start.as_str(), 20), (end.as_str(), 20)]);
    }
    Ok(())
}

fn print_details(record: &EventRecord) {
    print_field("Name", &record.name);
    print_field(
        "Description",
        record
            .description
            .as_deref()
            .unwrap_or("No description available."),
    );
    print_field("Start", &format_time(record.start_time));
    print_field("End", &format_time(record.end_time));
    print_field("Format", record.format.as_deref().unwrap_or("N/A"));
    print_field("Organizers", record.organizers.as_deref().unwrap_or("N/A"));
    print_field(
        "Weight",
        &record
            .weight
            .map(|w| w.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    );
    print_field(
        "Participants",
        &record
            .participant_count
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    );
    if let Some(url) = &record.source_url {
        print_field("CTFtime", url);
    }
    if let Some(url) = &record.site_url {
        print_field("Website", url);
    }

    let sent: Vec<_> = ctfnotify_core::NotificationKind::ALL
        .into_iter()
        .filter(|kind| record.flags.is_sent(*kind))
        .map(|kind| kind.as_str())
        .collect();
    if !sent.is_empty() {
        print_field("Notified", &sent.join(", "));
    }
}

pub async fn details(
    service: &AgendaService,
    output: OutputFormat,
    owner: OwnerId,
    name: &str,
) -> Result<()> {
    let Some(record) = service.details(owner, name).await? else {
        bail!("event '{}' not found in your agenda (names are case-sensitive)", name);
    };

    if output.is_text() {
        print_details(&record);
        Ok(())
    } else {
        output.print_value(&record)
    }
}

pub async fn remove(
    service: &AgendaService,
    output: OutputFormat,
    quiet: bool,
    owner: OwnerId,
    name: &str,
) -> Result<()> {
    if !service.remove(owner, name).await? {
        bail!("event '{}' not found in your agenda", name);
    }

    if output.is_text() {
        if !quiet {
            println!("Removed {} from your agenda.", name);
        }
        Ok(())
    } else {
        output.print_value(&json!({ "name": name, "status": "removed" }))
    }
}

pub async fn clear(
    service: &AgendaService,
    output: OutputFormat,
    quiet: bool,
    owner: OwnerId,
    confirmed: bool,
) -> Result<()> {
    if !confirmed {
        bail!("this removes every event in your agenda; pass --yes to confirm");
    }

    let removed = service.clear(owner).await?;
    if output.is_text() {
        if !quiet {
            println!("Removed {} event(s).", removed);
        }
        Ok(())
    } else {
        output.print_value(&json!({ "removed": removed }))
    }
}

pub async fn share(
    service: &AgendaService,
    output: OutputFormat,
    owner: OwnerId,
    name: &str,
    recipient: OwnerId,
) -> Result<()> {
    let (status, message) = match service.share(owner, name, recipient).await? {
        ShareOutcome::Shared(_) => ("shared", format!("Shared {} with {}.", name, recipient)),
        ShareOutcome::RecipientAlreadyHas => (
            "already_exists",
            format!("{} already has {} in their agenda.", recipient, name),
        ),
        ShareOutcome::NotFound => bail!("event '{}' not found in your agenda", name),
    };

    if output.is_text() {
        println!("{}", message);
        Ok(())
    } else {
        output.print_value(&json!({ "name": name, "recipient": recipient, "status": status }))
    }
}
