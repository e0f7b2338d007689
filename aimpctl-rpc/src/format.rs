//! The format-string mini-language used by `GetFormattedEntryTitle` and by
//! `GetPlaylistEntries`' format-string mode.
//!
//! Directives: `%A` album, `%a`/`%R` artist, `%B` bitrate, `%C` channels
//! count, `%F` filename, `%G` genre, `%H` sample rate, `%L` duration, `%S`
//! filesize, `%T` title, `%Y` date, `%M` rating. `%IF(cond,then,else)`
//! expands `else` when `cond` expands to the empty string, otherwise
//! `then`. A leading `%` escapes a literal `%`, `,`, or `)` inside an
//! `%IF` argument.

use aimpctl_store::EntryInfo;

use crate::error::{Result, RpcError};

pub fn render(format: &str, entry: &EntryInfo) -> Result<String> {
    let chars: Vec<char> = format.chars().collect();
    let mut pos = 0;
    let (out, next) = render_run(&chars, &mut pos, entry, &[])?;
    let _ = next;
    Ok(out)
}

/// Renders until `stop_at` is hit (unescaped) or input ends, returning the
/// rendered text and the character it stopped on (if any, for argument
/// splitting inside `%IF(...)`).
fn render_run(chars: &[char], pos: &mut usize, entry: &EntryInfo, stop_at: &[char]) -> Result<(String, Option<char>)> {
    let mut out = String::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        if stop_at.contains(&c) {
            return Ok((out, Some(c)));
        }
        if c == '%' {
            *pos += 1;
            if *pos >= chars.len() {
                return Err(RpcError::WrongArgument("trailing '%' in format string".into()));
            }
            let directive = chars[*pos];
            *pos += 1;
            match directive {
                '%' | ',' | ')' => out.push(directive),
                'A' => out.push_str(&entry.album),
                'a' | 'R' => out.push_str(&entry.artist),
                'B' => out.push_str(&entry.bitrate.to_string()),
                'C' => out.push_str(&entry.channels_count.to_string()),
                'F' => out.push_str(&entry.filename),
                'G' => out.push_str(&entry.genre),
                'H' => out.push_str(&entry.samplerate.to_string()),
                'L' => out.push_str(&entry.duration.to_string()),
                'S' => out.push_str(&entry.filesize.to_string()),
                'T' => out.push_str(&entry.title),
                'Y' => out.push_str(&entry.date),
                'M' => out.push_str(&entry.rating.to_string()),
                'I' => {
                    if chars.get(*pos) != Some(&'F') || chars.get(*pos + 1) != Some(&'(') {
                        return Err(RpcError::WrongArgument("expected %IF(".into()));
                    }
                    *pos += 2;
                    let (cond, sep) = render_run(chars, pos, entry, &[','])?;
                    if sep != Some(',') {
                        return Err(RpcError::WrongArgument("missing ',' in %IF".into()));
                    }
                    *pos += 1;
                    let (then_branch, sep) = render_run(chars, pos, entry, &[','])?;
                    if sep != Some(',') {
                        return Err(RpcError::WrongArgument("missing second ',' in %IF".into()));
                    }
                    *pos += 1;
                    let (else_branch, sep) = render_run(chars, pos, entry, &[')'])?;
                    if sep != Some(')') {
                        return Err(RpcError::WrongArgument("missing ')' in %IF".into()));
                    }
                    *pos += 1;
                    out.push_str(if cond.is_empty() { &else_branch } else { &then_branch });
                }
                other => {
                    return Err(RpcError::WrongArgument(format!("unknown format directive '%{other}'")));
                }
            }
        } else {
            out.push(c);
            *pos += 1;
        }
    }
    Ok((out, None))
}
