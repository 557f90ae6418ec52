//! Tests for buffer edit primitives, history laws and persistence.

use super::*;

fn buf(lines: &[&str]) -> TextBuffer {
    TextBuffer::from_text(&lines.join("\n"))
}

fn lines_of(b: &TextBuffer) -> Vec<&str> {
    b.lines().iter().map(String::as_str).collect()
}

#[test]
fn test_new_buffer_has_one_empty_line() {
    let b = TextBuffer::new();
    assert_eq!(b.line_count(), 1);
    assert_eq!(b.get_line(0), "");
    assert!(!b.is_modified());
}

#[test]
fn test_insert_char_clamps_column() {
    let mut b = buf(&["abc"]);
    b.insert_char(0, 99, 'd');
    b.insert_char(0, 0, '>');
    assert_eq!(lines_of(&b), [">abcd"]);
    assert!(b.is_modified());
}

#[test]
fn test_out_of_range_row_is_ignored() {
    let mut b = buf(&["abc"]);
    b.insert_char(5, 0, 'x');
    b.delete_char_back(5, 1);
    b.delete_char_forward(5, 0);
    b.insert_newline(5, 0);
    b.insert_text(5, 0, "zzz");
    b.delete_line(5);
    b.append_to_line(5, "q");
    assert_eq!(lines_of(&b), ["abc"]);
    assert!(!b.is_modified());
    assert_eq!(b.get_line(5), "");
}

#[test]
fn test_backspace_within_line() {
    let mut b = buf(&["abc"]);
    b.delete_char_back(0, 2);
    assert_eq!(lines_of(&b), ["ac"]);
}

#[test]
fn test_backspace_merges_with_previous_line() {
    let mut b = buf(&["ab", "cd"]);
    b.delete_char_back(1, 0);
    assert_eq!(lines_of(&b), ["abcd"]);
}

#[test]
fn test_backspace_at_document_start_is_noop() {
    let mut b = buf(&["ab"]);
    b.delete_char_back(0, 0);
    assert_eq!(lines_of(&b), ["ab"]);
    assert!(!b.is_modified());
}

#[test]
fn test_forward_delete_does_not_merge() {
    let mut b = buf(&["ab", "cd"]);
    b.delete_char_forward(0, 2);
    assert_eq!(lines_of(&b), ["ab", "cd"]);

    b.delete_char_forward(0, 0);
    assert_eq!(lines_of(&b), ["b", "cd"]);
}

#[test]
fn test_forward_delete_then_merge_next() {
    let mut b = buf(&["ab", "cd"]);
    b.delete_char_forward(0, 2);
    let next = b.get_line(1).to_string();
    b.append_to_line(0, &next);
    b.delete_line(1);
    assert_eq!(lines_of(&b), ["abcd"]);
}

#[test]
fn test_insert_newline_splits_line() {
    let mut b = buf(&["hello world"]);
    b.insert_newline(0, 5);
    assert_eq!(lines_of(&b), ["hello", " world"]);
    b.insert_newline(1, 100);
    assert_eq!(lines_of(&b), ["hello", " world", ""]);
}

#[test]
fn test_insert_char_newline_splits() {
    let mut b = buf(&["ab"]);
    b.insert_char(0, 1, '\n');
    assert_eq!(lines_of(&b), ["a", "b"]);
}

#[test]
fn test_insert_text_single_line() {
    let mut b = buf(&["herld"]);
    b.insert_text(0, 2, "llo wo");
    assert_eq!(lines_of(&b), ["hello world"]);
}

#[test]
fn test_insert_text_multi_line_at_end() {
    let mut b = buf(&["hello"]);
    b.insert_text(0, 5, "\nworld");
    assert_eq!(lines_of(&b), ["hello", "world"]);
}

#[test]
fn test_insert_text_multi_line_middle() {
    let mut b = buf(&["before", "AB", "after"]);
    b.insert_text(1, 1, "1\n2\n3");
    assert_eq!(lines_of(&b), ["before", "A1", "2", "3B", "after"]);
}

#[test]
fn test_insert_text_matches_newline_sequence() {
    let mut via_text = buf(&["xy"]);
    via_text.insert_text(0, 1, "a\nb");

    let mut via_prims = buf(&["xy"]);
    via_prims.insert_char(0, 1, 'a');
    via_prims.insert_newline(0, 2);
    via_prims.insert_char(1, 0, 'b');

    assert_eq!(via_text.lines(), via_prims.lines());
}

#[test]
fn test_insert_text_strips_crlf() {
    let mut b = buf(&[""]);
    b.insert_text(0, 0, "a\r\nb");
    assert_eq!(lines_of(&b), ["a", "b"]);
}

#[test]
fn test_delete_only_line_leaves_empty_line() {
    let mut b = buf(&["only"]);
    b.delete_line(0);
    assert_eq!(lines_of(&b), [""]);
    assert_eq!(b.line_count(), 1);
}

#[test]
fn test_multibyte_columns() {
    let mut b = buf(&["héllo"]);
    b.insert_char(0, 2, 'X');
    assert_eq!(lines_of(&b), ["héXllo"]);
    b.delete_char_back(0, 2);
    assert_eq!(lines_of(&b), ["hXllo"]);
    assert_eq!(buf(&["日本語"]).line_len(0), 3);
}

#[test]
fn test_get_and_set_text() {
    let mut b = TextBuffer::new();
    b.set_text("a\nb\nc");
    assert_eq!(b.line_count(), 3);
    assert_eq!(b.get_text(), "a\nb\nc");
    b.set_text("");
    assert_eq!(b.line_count(), 1);
}

#[test]
fn test_line_count_never_zero() {
    let mut b = buf(&["a", "b"]);
    for _ in 0..5 {
        b.delete_line(0);
        b.delete_char_back(0, 0);
        b.delete_char_forward(0, 0);
        assert!(b.line_count() >= 1);
    }
    b.set_text("");
    assert!(b.line_count() >= 1);
}

// =============================================================================
// History
// =============================================================================

#[test]
fn test_undo_redo_inverse_law() {
    let mut b = buf(&["ab", "cd"]);
    let before = b.lines().to_vec();

    b.save_state(Cursor::new(1, 0));
    b.delete_char_back(1, 0);
    let after = b.lines().to_vec();

    assert_eq!(b.undo(Cursor::new(0, 2)), Some(Cursor::new(1, 0)));
    assert_eq!(b.lines(), before.as_slice());

    assert_eq!(b.redo(Cursor::new(1, 0)), Some(Cursor::new(0, 2)));
    assert_eq!(b.lines(), after.as_slice());
}

#[test]
fn test_branch_discard_after_undo() {
    let mut b = buf(&["x"]);
    b.save_state(Cursor::default());
    b.insert_char(0, 1, 'y');
    assert!(b.undo(Cursor::new(0, 2)).is_some());

    b.save_state(Cursor::default());
    b.insert_char(0, 0, 'z');
    assert!(b.redo(Cursor::default()).is_none());
    assert_eq!(lines_of(&b), ["zx"]);
}

#[test]
fn test_undo_on_fresh_buffer_fails() {
    let mut b = TextBuffer::new();
    assert!(b.undo(Cursor::default()).is_none());
    assert!(b.redo(Cursor::default()).is_none());
}

#[test]
fn test_bounded_history_keeps_recent_edits() {
    let mut b = TextBuffer::new();
    for i in 0..=MAX_HISTORY_SIZE {
        b.save_state(Cursor::new(0, i));
        b.insert_char(0, i, 'x');
    }
    assert_eq!(b.history().undo_len(), MAX_HISTORY_SIZE);

    let mut undone = 0;
    while b.undo(Cursor::default()).is_some() {
        undone += 1;
    }
    assert_eq!(undone, MAX_HISTORY_SIZE);
    // The very first edit can no longer be undone.
    assert_eq!(b.get_line(0), "x");
}

#[test]
fn test_undo_marks_modified() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("m.txt");
    let mut b = buf(&["a"]);
    b.save_state(Cursor::default());
    b.insert_char(0, 0, 'b');
    b.save(&path)?;
    assert!(!b.is_modified());
    assert!(b.undo(Cursor::default()).is_some());
    assert!(b.is_modified());
    Ok(())
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_save_then_load_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("doc.txt");

    let mut b = buf(&["a", "b"]);
    b.insert_char(0, 1, '!');
    b.save(&path)?;
    assert!(!b.is_modified());
    assert_eq!(std::fs::read_to_string(&path)?, "a!\nb");

    let mut loaded = TextBuffer::new();
    loaded.load(&path)?;
    assert_eq!(loaded.lines(), b.lines());
    assert!(!loaded.is_modified());
    Ok(())
}

#[test]
fn test_load_missing_file_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut b = buf(&["stale"]);
    b.load(&dir.path().join("missing.txt"))?;
    assert_eq!(lines_of(&b), [""]);
    assert!(!b.is_modified());
    Ok(())
}

#[test]
fn test_load_empty_file_and_crlf() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let empty = dir.path().join("empty.txt");
    std::fs::write(&empty, "")?;
    let mut b = TextBuffer::new();
    b.load(&empty)?;
    assert_eq!(lines_of(&b), [""]);

    let crlf = dir.path().join("crlf.txt");
    std::fs::write(&crlf, "one\r\ntwo")?;
    b.load(&crlf)?;
    assert_eq!(lines_of(&b), ["one", "two"]);
    Ok(())
}

#[test]
fn test_load_directory_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut b = TextBuffer::new();
    assert!(b.load(dir.path()).is_err());
    Ok(())
}
