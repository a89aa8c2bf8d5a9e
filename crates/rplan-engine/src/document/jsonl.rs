use crate::actions::Action;

pub fn encode_action_jsonl_line(action: &Action) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(action)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_action_jsonl_line(line: &str) -> serde_json::Result<Action> {
    serde_json::from_str::<Action>(line.trim_end())
}

#[cfg(test)]
#[path = "jsonl_test.rs"]
mod tests;
