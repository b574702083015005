use asc_core::ScriptError;

/// Stdout lines describing a failed command. `ERROR_LINE` is 1-based and only
/// present for errors tied to a script line.
pub(crate) fn error_lines(error: &ScriptError) -> Vec<String> {
    let mut lines = vec![
        "RESULT:ERROR".to_string(),
        format!("ERROR_CODE:{}", error.code),
    ];
    if let Some(line) = error.line {
        lines.push(format!("ERROR_LINE:{}", line + 1));
    }
    lines.push(format!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"\"".to_string())
    ));
    lines
}

pub(crate) fn emit_error(error: ScriptError) -> i32 {
    for line in error_lines(&error) {
        println!("{}", line);
    }
    1
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> ScriptError {
    ScriptError::new("CLI_OUTPUT", error.to_string())
}
