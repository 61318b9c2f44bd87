//! Stack text parsing

use super::types::StackFrame;

/// Parse stack text into frames, outermost caller first.
///
/// Understands the `std::backtrace` layout (`N: function` followed by an
/// `at file:line:col` line) and single-line `at function (file:line:col)`
/// frames. Lines matching neither are skipped.
pub fn parse_stack(stack: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in stack.lines().map(str::trim) {
        if let Some(function) = numbered_frame(line) {
            frames.push(StackFrame {
                function: function.to_string(),
                filename: None,
                lineno: None,
                colno: None,
            });
            continue;
        }

        let Some(rest) = line.strip_prefix("at ") else {
            continue;
        };

        if let Some((function, location)) = split_call(rest) {
            let (filename, lineno, colno) = parse_location(location);
            frames.push(StackFrame {
                function: function.to_string(),
                filename: Some(filename),
                lineno,
                colno,
            });
            continue;
        }

        // Location line belonging to the preceding numbered frame
        let (filename, lineno, colno) = parse_location(rest);
        match frames.last_mut() {
            Some(frame) if frame.filename.is_none() => {
                frame.filename = Some(filename);
                frame.lineno = lineno;
                frame.colno = colno;
            }
            _ => frames.push(StackFrame {
                function: "<anonymous>".to_string(),
                filename: Some(filename),
                lineno,
                colno,
            }),
        }
    }

    frames.reverse();
    frames
}

/// `12: some::function` -> `some::function`
fn numbered_frame(line: &str) -> Option<&str> {
    let (index, function) = line.split_once(": ")?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(function.trim())
}

/// `function (location)` -> (`function`, `location`)
fn split_call(rest: &str) -> Option<(&str, &str)> {
    let body = rest.strip_suffix(')')?;
    let open = body.rfind(" (")?;
    Some((body[..open].trim(), &body[open + 2..]))
}

/// `file:line:col`, `file:line` or bare `file`
fn parse_location(location: &str) -> (String, Option<u32>, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let first = parts.next();

    match (first, middle, last) {
        (Some(file), Some(line), Some(col)) => match (line.parse(), col.parse()) {
            (Ok(line), Ok(col)) => (file.to_string(), Some(line), Some(col)),
            (_, Ok(line)) => (format!("{}:{}", file, middle.unwrap_or_default()), Some(line), None),
            _ => (location.to_string(), None, None),
        },
        (None, Some(file), Some(line)) => match line.parse() {
            Ok(line) => (file.to_string(), Some(line), None),
            Err(_) => (location.to_string(), None, None),
        },
        _ => (location.to_string(), None, None),
    }
}
