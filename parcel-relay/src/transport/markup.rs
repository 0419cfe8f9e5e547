/// Characters MarkdownV2 treats as markup.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Caption for an artifact small enough to go in one message.
pub fn document_caption(name: &str, encrypted: bool) -> String {
    let status = if encrypted {
        "🔒 Encrypted"
    } else {
        "🔓 Not encrypted"
    };
    escape_markdown_v2(&format!("File: {name}\n{status}"))
}

/// Caption for part `index` of `total`.
pub fn part_caption(name: &str, index: u32, total: u32) -> String {
    let mut caption = escape_markdown_v2(&format!("Part {index} of {name}"));
    caption.push_str(&format!("\n\\(Part {index}/{total}\\)"));
    caption
}
