use std::str::FromStr;

use eventable_application::EventScope;
use eventable_core::{AppError, AppResult};
use eventable_domain::{EventId, UserId};

const USAGE: &str = "usage: eventable-admin [migrate | list [batched | batch <event-id> | user <user-id>] [--limit N] [--offset N] | show <event-id> | delete <event-id>]";

/// Subcommand selected by the first CLI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Migrate,
    List {
        scope: EventScope,
        limit: usize,
        offset: usize,
    },
    Show(EventId),
    Delete(EventId),
}

impl AdminCommand {
    /// Parses the arguments that follow the binary name. No arguments lists
    /// the most recent page of all events.
    pub fn parse(args: &[String]) -> AppResult<Self> {
        let mut args = args.iter().map(String::as_str);

        match args.next() {
            None => Ok(Self::List {
                scope: EventScope::All,
                limit: 100,
                offset: 0,
            }),
            Some("migrate") => no_more(args, Self::Migrate),
            Some("show") => {
                let event_id = parse_value::<EventId>(args.next(), "event id")?;
                no_more(args, Self::Show(event_id))
            }
            Some("delete") => {
                let event_id = parse_value::<EventId>(args.next(), "event id")?;
                no_more(args, Self::Delete(event_id))
            }
            Some("list") => parse_list(args.collect()),
            Some(other) => Err(AppError::Validation(format!(
                "unknown command '{other}'; {USAGE}"
            ))),
        }
    }
}

fn parse_list(args: Vec<&str>) -> AppResult<AdminCommand> {
    let mut scope = EventScope::All;
    let mut limit = 100;
    let mut offset = 0;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg {
            "batched" => scope = EventScope::Batched,
            "batch" => scope = EventScope::ByBatch(parse_value(args.next(), "batch event id")?),
            "user" => scope = EventScope::ByUser(parse_value::<UserId>(args.next(), "user id")?),
            "--limit" => limit = parse_value(args.next(), "limit")?,
            "--offset" => offset = parse_value(args.next(), "offset")?,
            other => {
                return Err(AppError::Validation(format!(
                    "unexpected list argument '{other}'; {USAGE}"
                )));
            }
        }
    }

    Ok(AdminCommand::List {
        scope,
        limit,
        offset,
    })
}

fn parse_value<T>(value: Option<&str>, name: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value =
        value.ok_or_else(|| AppError::Validation(format!("{name} is required; {USAGE}")))?;
    value
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))
}

fn no_more<'a>(
    mut rest: impl Iterator<Item = &'a str>,
    command: AdminCommand,
) -> AppResult<AdminCommand> {
    match rest.next() {
        Some(extra) => Err(AppError::Validation(format!(
            "unexpected argument '{extra}'; {USAGE}"
        ))),
        None => Ok(command),
    }
}
