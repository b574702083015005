use std::sync::OnceLock;

use asc_core::{CallResult, ParseError, ScriptBody, ScriptHandle, StepError};
use regex::Regex;
use tracing::{info, warn};

use super::host::{CallRequest, ScriptParser, StepOutcome, StepProvider};

const WAIT_REMAINING_KEY: &str = "dry_run.wait_remaining";

#[derive(Debug, Clone, PartialEq, Eq)]
enum DryRunCommand {
    Blank,
    Call {
        target: String,
        params: Option<Vec<String>>,
    },
    Return(Option<String>),
    Wait(u64),
    Fail(String),
    Stop,
    Other(String),
}

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'|"([^"]*)"|(\S+)"#).expect("token regex must compile")
    })
}

fn tokenize(text: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    for captures in token_regex().captures_iter(text) {
        if let Some(quoted) = captures.get(1).or_else(|| captures.get(2)) {
            tokens.push(quoted.as_str().to_string());
            continue;
        }
        let Some(bare) = captures.get(3) else {
            continue;
        };
        if bare.as_str().contains(['\'', '"']) {
            return Err("Unterminated string".to_string());
        }
        tokens.push(bare.as_str().to_string());
    }
    Ok(tokens)
}

fn parse_command(text: &str) -> Result<DryRunCommand, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
        return Ok(DryRunCommand::Blank);
    }

    let tokens = tokenize(trimmed)?;
    let Some(keyword) = tokens.first() else {
        return Ok(DryRunCommand::Blank);
    };

    match keyword.to_ascii_lowercase().as_str() {
        "call" => {
            let target = tokens
                .get(1)
                .filter(|target| !target.is_empty())
                .ok_or_else(|| "call requires a script name".to_string())?;
            let params = (tokens.len() > 2).then(|| tokens[2..].to_vec());
            Ok(DryRunCommand::Call {
                target: target.clone(),
                params,
            })
        }
        "return" => Ok(DryRunCommand::Return(tokens.get(1).cloned())),
        "wait" => tokens
            .get(1)
            .and_then(|count| count.parse::<u64>().ok())
            .map(DryRunCommand::Wait)
            .ok_or_else(|| "wait requires a tick count".to_string()),
        "fail" => {
            let message = tokens[1..].join(" ");
            Ok(DryRunCommand::Fail(if message.is_empty() {
                "fail".to_string()
            } else {
                message
            }))
        }
        "stop" => Ok(DryRunCommand::Stop),
        _ => Ok(DryRunCommand::Other(trimmed.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedLine {
    pub script: String,
    pub line: usize,
    pub text: String,
}

/// Reference step provider: one line per step, with `call`, `return`, `wait`,
/// `fail` and `stop` understood and every other line treated as a no-op
/// command.
#[derive(Debug, Default)]
pub struct DryRunProvider {
    executed: Vec<ExecutedLine>,
}

impl DryRunProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> &[ExecutedLine] {
        &self.executed
    }

    fn step(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        match script.take_call_result() {
            Some(CallResult::Returned { value }) => {
                info!(script = %script.name(), line = script.cursor(), value = ?value, "resumed after call");
                script.advance();
            }
            Some(CallResult::Rejected { reason }) => {
                warn!(script = %script.name(), line = script.cursor(), "call rejected: {}", reason);
                script.advance();
            }
            None => {}
        }

        let Some(text) = script.current_text().map(str::to_string) else {
            return Ok(StepOutcome::Complete);
        };
        let line = script.cursor();
        let command = parse_command(&text).map_err(StepError::new)?;

        let outcome = match command {
            DryRunCommand::Blank => {
                script.advance();
                StepOutcome::Continue
            }
            DryRunCommand::Call { target, params } => {
                self.record(script, line, &text);
                return Ok(StepOutcome::Call(CallRequest::new(target, params)));
            }
            DryRunCommand::Return(value) => {
                self.record(script, line, &text);
                return Ok(StepOutcome::Return(value));
            }
            DryRunCommand::Wait(ticks) => {
                let remaining = script
                    .scratch(WAIT_REMAINING_KEY)
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(ticks);
                if remaining == 0 {
                    script.remove_scratch(WAIT_REMAINING_KEY);
                    self.record(script, line, &text);
                    script.advance();
                } else {
                    script.set_scratch(WAIT_REMAINING_KEY, (remaining - 1).to_string());
                }
                StepOutcome::Continue
            }
            DryRunCommand::Fail(message) => return Err(StepError::new(message)),
            DryRunCommand::Stop => {
                self.record(script, line, &text);
                return Ok(StepOutcome::Complete);
            }
            DryRunCommand::Other(command) => {
                info!(script = %script.name(), line = line + 1, "{}", command);
                self.record(script, line, &text);
                script.advance();
                StepOutcome::Continue
            }
        };

        if script.is_at_end() {
            return Ok(StepOutcome::Complete);
        }
        Ok(outcome)
    }

    fn record(&mut self, script: &ScriptHandle, line: usize, text: &str) {
        self.executed.push(ExecutedLine {
            script: script.name().to_string(),
            line,
            text: text.to_string(),
        });
    }
}

impl StepProvider for DryRunProvider {
    fn start_script(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.step(script)
    }

    fn execute_step(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.step(script)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunParser;

impl ScriptParser for DryRunParser {
    fn parse(&self, _name: &str, body: &ScriptBody) -> Result<(), ParseError> {
        for (index, text) in body.lines().iter().enumerate() {
            parse_command(text).map_err(|message| ParseError::new(message, text.clone(), index))?;
        }
        Ok(())
    }
}
