// THEORY:
// A recognizer reports individual text lines, in reading order, possibly from
// more than one MRZ in the same frame and mixed with stray text. Grouping turns
// that flat list into candidate regions the classifier can judge one at a time.
// A region is a run of consecutive lines sharing an MRZ line width: three lines
// for 30-character zones, two for 36 and 44. Lines of any other width are noise.
//
// Stray text can share an MRZ width (a printed name line on a passport is often
// exactly 44 characters). When a window is not accepted but the window one line
// further down is, the first line is treated as noise and skipped. Otherwise the
// window is kept as an unmatched region so its text still reaches the caller.

use crate::core_modules::geometry::Quad;
use crate::core_modules::line_set::LineSet;
use crate::core_modules::recognizer::LineItem;

const MRZ_LINE_WIDTHS: [usize; 3] = [30, 36, 44];

/// One candidate MRZ: its lines and the quad covering them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRegion {
    pub lines: LineSet,
    pub location: Quad,
}

fn width(item: &LineItem) -> usize {
    item.text.trim().chars().count()
}

/// The equal-width window starting at `start`, if there is one.
fn window(items: &[LineItem], start: usize) -> Option<LineRegion> {
    let w = width(items.get(start)?);
    if !MRZ_LINE_WIDTHS.contains(&w) {
        return None;
    }
    let size = if w == 30 { 3 } else { 2 };
    let run = items.get(start..start + size)?;
    if !run.iter().all(|item| width(item) == w) {
        return None;
    }
    Some(LineRegion {
        lines: LineSet::new(run.iter().map(|item| item.text.as_str())),
        location: Quad::spanning(&run[0].location, &run[size - 1].location),
    })
}

/// Groups recognized lines into candidate regions. `accepts` decides whether a
/// window is a real MRZ; it steers which lines are skipped as noise.
pub fn group_line_sets(items: &[LineItem], accepts: impl Fn(&LineSet) -> bool) -> Vec<LineRegion> {
    let mut regions = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let Some(region) = window(items, i) else {
            i += 1;
            continue;
        };
        if !accepts(&region.lines) && window(items, i + 1).is_some_and(|next| accepts(&next.lines)) {
            i += 1;
            continue;
        }
        i += region.lines.len();
        regions.push(region);
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, row: i32) -> LineItem {
        LineItem::new(text, Quad::rect(10, row * 40, 800, 30))
    }

    #[test]
    fn groups_passport_lines_and_skips_noise() {
        let items = [
            item("PASSPORT", 0),
            item("P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<", 1),
            item("L898902C36UTO7408122F1204159ZE184226B<<<<<10", 2),
        ];
        let regions = group_line_sets(&items, |_| true);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.len(), 2);
        assert_eq!(regions[0].location, Quad::rect(10, 40, 800, 70));
    }

    #[test]
    fn td1_needs_three_lines() {
        let line = "I<UTOD231458907<<<<<<<<<<<<<<<";
        assert!(group_line_sets(&[item(line, 0), item(line, 1)], |_| true).is_empty());
        let regions = group_line_sets(&[item(line, 0), item(line, 1), item(line, 2)], |_| true);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.len(), 3);
    }

    #[test]
    fn same_width_noise_above_a_zone_is_skipped() {
        let items = [
            item("ERIKSSON ANNA MARIA UTOPIA PASSPORT L898902C", 0),
            item("P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<", 1),
            item("L898902C36UTO7408122F1204159ZE184226B<<<<<10", 2),
        ];
        assert_eq!(items[0].text.len(), 44);
        let is_passport = |set: &LineSet| set.lines()[0].starts_with("P<");
        let regions = group_line_sets(&items, is_passport);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.lines()[0], items[1].text);
        assert_eq!(regions[0].location, Quad::rect(10, 40, 800, 70));
    }

    #[test]
    fn unaccepted_window_is_still_reported() {
        let items = [
            item("P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<", 0),
            item("L898902C37UTO7408122F1204159ZE184226B<<<<<10", 1),
        ];
        let regions = group_line_sets(&items, |_| false);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.len(), 2);
    }

    #[test]
    fn mismatched_widths_do_not_group() {
        let items = [
            item("I<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<", 0),
            item("L898902C36UTO7408122F1204159ZE184226B<<<<<10", 1),
            item("L898902C36UTO7408122F1204159ZE184226B<<<<<10", 2),
        ];
        let regions = group_line_sets(&items, |_| true);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].location.top_left().y, 40);
    }
}
