use anyhow::{anyhow, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

use super::{ge, normalize_dlp, siemens, DoseAcquisition, DoseScreen, Vendor};

pub(super) enum LineMatch {
    Acquisition(DoseAcquisition),
    Total {
        dlp: String,
        mas: Option<String>,
    },
}

pub(super) struct LineRule {
    pub(super) name: &'static str,
    pub(super) pattern: &'static str,
    pub(super) extract: fn(&Captures<'_>) -> Option<LineMatch>,
}

struct CompiledRule {
    name: &'static str,
    regex: Regex,
    extract: fn(&Captures<'_>) -> Option<LineMatch>,
}

struct Grammar {
    rules: Vec<CompiledRule>,
}

impl Grammar {
    fn compile(rules: &[LineRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    name: rule.name,
                    regex: Regex::new(rule.pattern)?,
                    extract: rule.extract,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    fn match_line(&self, line: &str) -> Option<(&'static str, LineMatch)> {
        self.rules.iter().find_map(|rule| {
            let captures = rule.regex.captures(line)?;
            (rule.extract)(&captures).map(|found| (rule.name, found))
        })
    }
}

fn grammar(vendor: Vendor) -> Result<&'static Grammar> {
    static GE: OnceLock<Result<Grammar, regex::Error>> = OnceLock::new();
    static SIEMENS: OnceLock<Result<Grammar, regex::Error>> = OnceLock::new();
    let compiled = match vendor {
        Vendor::Ge => GE.get_or_init(|| Grammar::compile(ge::RULES)),
        Vendor::Siemens => SIEMENS.get_or_init(|| Grammar::compile(siemens::RULES)),
    };
    compiled
        .as_ref()
        .map_err(|err| anyhow!("invalid {} dose grammar: {}", vendor, err))
}

/// Parses reconstructed screen lines into acquisitions and the printed total.
///
/// `scope` (usually the study identifier) is stamped on every acquisition.
/// When several total lines are present the first one wins.
pub fn parse_dose_screen<S: AsRef<str>>(
    lines: &[S],
    vendor: Vendor,
    scope: Option<&str>,
) -> Result<DoseScreen> {
    let grammar = grammar(vendor)?;
    let mut screen = DoseScreen::new(vendor);
    for line in lines {
        let upper = line.as_ref().trim().to_uppercase();
        if upper.is_empty() {
            continue;
        }
        match grammar.match_line(&upper) {
            Some((rule, LineMatch::Acquisition(mut acquisition))) => {
                debug!(rule, line = %upper, "acquisition line");
                acquisition.scope = scope.map(str::to_string);
                screen.acquisitions.push(acquisition);
            }
            Some((rule, LineMatch::Total { dlp, mas })) => {
                if screen.total_dlp.is_none() {
                    debug!(rule, total = %dlp, "total line");
                    screen.total_dlp = Some(dlp);
                    screen.total_mas = mas;
                } else {
                    debug!(rule, total = %dlp, "ignoring repeated total line");
                }
            }
            None => debug!(line = %upper, "no grammar rule matched"),
        }
    }
    Ok(screen)
}

pub(super) fn text(captures: &Captures<'_>, name: &str) -> Option<String> {
    let value = captures.name(name)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(super) fn label(captures: &Captures<'_>, name: &str) -> Option<String> {
    let value = captures
        .name(name)?
        .as_str()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if value.is_empty() { None } else { Some(value) }
}

/// Capture text that parses as a number; anything else counts as absent.
pub(super) fn number(captures: &Captures<'_>, name: &str) -> Option<String> {
    let value = text(captures, name)?;
    if value.parse::<f64>().is_ok() {
        Some(value)
    } else {
        debug!(field = name, value = %value, "unparsable numeric field");
        None
    }
}

pub(super) fn dlp(captures: &Captures<'_>, name: &str) -> Option<String> {
    number(captures, name).map(|value| normalize_dlp(&value))
}

pub(super) fn total(captures: &Captures<'_>) -> Option<LineMatch> {
    Some(LineMatch::Total {
        dlp: dlp(captures, "dlp")?,
        mas: number(captures, "mas"),
    })
}
