//! Parses `--select` lists such as `all`, `3` or `1,4-6`.

use anyhow::{bail, Context, Result};

/// 0-based indices into a listing of `total` chapters, ascending and unique.
/// Input numbers are 1-based listing positions.
pub fn parse_selection(list: &str, total: usize) -> Result<Vec<usize>> {
    let list = list.trim();
    if list.eq_ignore_ascii_case("all") {
        return Ok((0..total).collect());
    }

    let mut picked = vec![false; total];
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_number(a)?, parse_number(b)?),
            None => {
                let n = parse_number(part)?;
                (n, n)
            }
        };
        if start == 0 || start > end {
            bail!("invalid range {part:?}");
        }
        if end > total {
            bail!("chapter {end} is out of range (listing has {total})");
        }
        for slot in &mut picked[start - 1..end] {
            *slot = true;
        }
    }

    let indices: Vec<usize> = picked
        .iter()
        .enumerate()
        .filter_map(|(i, on)| on.then_some(i))
        .collect();
    if indices.is_empty() {
        bail!("selection {list:?} picks no chapters");
    }
    Ok(indices)
}

fn parse_number(s: &str) -> Result<usize> {
    s.trim()
        .parse::<usize>()
        .with_context(|| format!("not a chapter number: {s:?}"))
}
