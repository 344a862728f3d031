//! Configuration validation

use crate::schema::{RawConfig, RawPunishment};
use crate::PLACEHOLDERS;
use playclock_util::{TimeOfDay, Zone};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("Invalid reset time: {0}")]
    InvalidResetTime(String),

    #[error("Time limit must be greater than zero")]
    ZeroTimeLimit,

    #[error("Punishment command cannot be empty")]
    EmptyCommand,

    #[error("Unknown placeholder '{{{name}}}' in {field}")]
    UnknownPlaceholder { field: String, name: String },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(zone) = &config.time_zone {
        if Zone::parse(zone).is_err() {
            errors.push(ValidationError::UnknownTimeZone(zone.clone()));
        }
    }

    if let Some(reset) = &config.reset_time {
        if let Err(e) = TimeOfDay::new(reset.hour, reset.minute, reset.second) {
            errors.push(ValidationError::InvalidResetTime(e.to_string()));
        }
    }

    if let Some(limit) = &config.time_limit {
        if limit.total_seconds() == 0 {
            errors.push(ValidationError::ZeroTimeLimit);
        }
    }

    match &config.punishment {
        Some(RawPunishment::Command { argv }) => {
            if argv.first().is_none_or(|program| program.trim().is_empty()) {
                errors.push(ValidationError::EmptyCommand);
            }
            for (i, arg) in argv.iter().enumerate() {
                errors.extend(check_placeholders(arg, &format!("argv[{}]", i)));
            }
        }
        Some(RawPunishment::Ban {
            message: Some(message),
        }) => {
            errors.extend(check_placeholders(message, "ban message"));
        }
        _ => {}
    }

    errors
}

fn check_placeholders(template: &str, field: &str) -> Vec<ValidationError> {
    placeholder_names(template)
        .into_iter()
        .filter(|name| !PLACEHOLDERS.contains(name))
        .map(|name| ValidationError::UnknownPlaceholder {
            field: field.to_string(),
            name: name.to_string(),
        })
        .collect()
}

/// A piece of a punishment template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split a template into literal text and `{name}` placeholders. An unclosed
/// brace is literal text.
pub(crate) fn template_segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Placeholder(&after[..close]));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

/// Names of all `{name}` placeholders in a template
fn placeholder_names(template: &str) -> Vec<&str> {
    template_segments(template)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawResetTime, RawServiceConfig, RawTimeLimit};

    fn base() -> RawConfig {
        RawConfig {
            config_version: 1,
            time_zone: None,
            reset_time: None,
            time_limit: None,
            punishment: None,
            service: RawServiceConfig::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&base()).is_empty());
    }

    #[test]
    fn all_errors_are_collected() {
        let config = RawConfig {
            time_zone: Some("Atlantis/Capital".into()),
            reset_time: Some(RawResetTime {
                hour: 24,
                minute: 0,
                second: 0,
            }),
            time_limit: Some(RawTimeLimit::default()),
            punishment: Some(RawPunishment::Command { argv: vec![] }),
            ..base()
        };

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::UnknownTimeZone("Atlantis/Capital".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeLimit));
        assert!(errors.contains(&ValidationError::EmptyCommand));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidResetTime(_))));
    }

    #[test]
    fn unknown_placeholder_in_command() {
        let config = RawConfig {
            punishment: Some(RawPunishment::Command {
                argv: vec!["/usr/bin/kick".into(), "{user}".into(), "{player}".into()],
            }),
            ..base()
        };

        let errors = validate_config(&config);
        assert_eq!(
            errors,
            vec![ValidationError::UnknownPlaceholder {
                field: "argv[2]".into(),
                name: "player".into(),
            }]
        );
        assert_eq!(errors[0].to_string(), "Unknown placeholder '{player}' in argv[2]");
    }

    #[test]
    fn unknown_placeholder_in_ban_message() {
        let config = RawConfig {
            punishment: Some(RawPunishment::Ban {
                message: Some("Out of time until {untill}".into()),
            }),
            ..base()
        };
        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn placeholder_scanning() {
        assert_eq!(placeholder_names("{user} has {limit} until {until}"), vec!["user", "limit", "until"]);
        assert!(placeholder_names("no placeholders").is_empty());
        assert!(placeholder_names("unclosed {user").is_empty());
    }

    #[test]
    fn template_segments_keep_literal_text() {
        assert_eq!(
            template_segments("kick {user} now {"),
            vec![
                Segment::Text("kick "),
                Segment::Placeholder("user"),
                Segment::Text(" now {"),
            ]
        );
        assert!(template_segments("").is_empty());
    }
}
