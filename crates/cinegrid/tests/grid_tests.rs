//! Grid cell records, row operations, overlays and the typing buffer.

use std::path::PathBuf;
use std::sync::Arc;

use cinegrid::{
    AppContext, ColumnDef, Container, Control, Error, EventKind, EventResult, EventValue, GridCellChange,
    HeadlessToolkit, KeyInput, LoopStatus, NativePayload, NativeSignal, Toolkit, UserData, Value, WindowId,
};
use cinegrid::widget::Grid;
use parking_lot::Mutex;

struct Fixture {
    ctx: AppContext,
    toolkit: Arc<HeadlessToolkit>,
    window_id: WindowId,
    grid: Grid,
}

fn fixture(control: Control) -> Fixture {
    let (ctx, toolkit) = AppContext::headless();
    let window_id = ctx.next_window_id().unwrap();
    let native = toolkit.create_window("Files", "files_window").unwrap();
    let body = Container::vbox("file_controls");
    body.add_row([control]).unwrap();
    body.materialize(&ctx, window_id, native, "files_window", None).unwrap();
    let grid = ctx.widget_get(window_id, "file_controls", "files").unwrap().as_grid().unwrap();
    Fixture {
        ctx,
        toolkit,
        window_id,
        grid,
    }
}

fn columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("File", "file"),
        ColumnDef::new("Duration", "duration"),
        ColumnDef::new("Keep", "keep").checkable(),
    ]
}

fn drain(toolkit: &HeadlessToolkit) {
    while toolkit.process_events().unwrap() == LoopStatus::Processed {}
}

#[test]
fn test_first_write_sets_original() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;

    grid.value_set(0, 1, 90, UserData::none()).unwrap();
    assert_eq!(grid.original_get(0, 1).unwrap(), Some(Value::Int(90)));
    assert_eq!(grid.peek(0, 1).unwrap(), Some(Value::Int(90)));
    assert_eq!(grid.previous_get(0, 1).unwrap(), None);

    grid.value_set(0, 1, 120, UserData::none()).unwrap();
    grid.value_set(0, 1, 150, UserData::none()).unwrap();
    assert_eq!(grid.original_get(0, 1).unwrap(), Some(Value::Int(90)));
    assert_eq!(grid.previous_get(0, 1).unwrap(), Some(Value::Int(120)));
    assert_eq!(grid.peek(0, 1).unwrap(), Some(Value::Int(150)));
}

#[test]
fn test_read_commits_edited_text_as_existing_kind() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    grid.value_set(0, 1, 90, UserData::none()).unwrap();

    let native = grid.widget().native();
    f.toolkit.grid_set_cell_text(native, 0, 1, "42").unwrap();
    assert_eq!(grid.read_and_commit(0, 1).unwrap(), Value::Int(42));
    assert_eq!(grid.previous_get(0, 1).unwrap(), Some(Value::Int(90)));
    assert_eq!(grid.original_get(0, 1).unwrap(), Some(Value::Int(90)));

    // Reading again with no edit changes nothing.
    assert_eq!(grid.read_and_commit(0, 1).unwrap(), Value::Int(42));
    assert_eq!(grid.previous_get(0, 1).unwrap(), Some(Value::Int(90)));

    f.toolkit.grid_set_cell_text(native, 0, 1, "long").unwrap();
    assert!(matches!(grid.read_and_commit(0, 1), Err(Error::ValueParse { .. })));
    assert_eq!(grid.peek(0, 1).unwrap(), Some(Value::Int(42)));
}

#[test]
fn test_read_of_an_unwritten_cell_is_a_string() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    grid.row_append().unwrap();

    f.toolkit.grid_set_cell_text(grid.widget().native(), 0, 1, "12").unwrap();
    assert_eq!(grid.read_and_commit(0, 1).unwrap(), Value::from("12"));
}

#[test]
fn test_out_of_range_access() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    grid.value_set(1, 0, "b.mp4", UserData::none()).unwrap();

    assert!(matches!(grid.peek(2, 0), Err(Error::CellOutOfRange { row: 2, rows: 2, .. })));
    assert!(matches!(grid.read_and_commit(0, 3), Err(Error::CellOutOfRange { col: 3, cols: 3, .. })));
    assert!(matches!(grid.row_delete(5), Err(Error::CellOutOfRange { .. })));
    assert!(matches!(grid.row_insert(3), Err(Error::CellOutOfRange { .. })));
}

#[test]
fn test_checked_cells() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    let keep = grid.colindex_get("keep").unwrap();
    for (row, name) in ["a.mp4", "b.mp4", "c.mp4"].into_iter().enumerate() {
        grid.value_set(row, 0, name, UserData::none()).unwrap();
    }

    grid.checked_set(1, keep, true).unwrap();
    assert!(grid.checked_get(1, keep).unwrap());
    assert_eq!(grid.checked_rows(keep).unwrap(), vec![1]);
    // Checking does not touch the cell's value.
    assert_eq!(grid.peek(1, keep).unwrap(), None);

    grid.check_all(keep, true).unwrap();
    assert_eq!(grid.checked_rows(keep).unwrap(), vec![0, 1, 2]);
    grid.check_all(keep, false).unwrap();
    assert!(grid.checked_rows(keep).unwrap().is_empty());
}

#[test]
fn test_row_moves_carry_records() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    for (row, name) in ["a.mp4", "b.mp4", "c.mp4"].into_iter().enumerate() {
        grid.value_set(row, 0, name, UserData::new(row)).unwrap();
    }

    assert_eq!(grid.move_row_up(2).unwrap(), 1);
    assert_eq!(grid.peek(1, 0).unwrap(), Some(Value::from("c.mp4")));
    assert_eq!(grid.userdata_get(1, 0).unwrap().downcast_ref::<usize>(), Some(&2));
    assert_eq!(grid.origin_row(1, 0).unwrap(), 2);

    assert_eq!(grid.move_row_up(0).unwrap(), 0);
    assert_eq!(grid.move_row_down(2).unwrap(), 2);
    assert_eq!(grid.move_row_down(0).unwrap(), 1);
    assert_eq!(grid.peek(0, 0).unwrap(), Some(Value::from("c.mp4")));

    grid.row_insert(0).unwrap();
    assert_eq!(grid.row_count().unwrap(), 4);
    assert_eq!(grid.peek(0, 0).unwrap(), None);
    grid.row_delete(0).unwrap();
    assert_eq!(grid.peek(0, 0).unwrap(), Some(Value::from("c.mp4")));

    let text = f.toolkit.grid_cell_text(grid.widget().native(), 0, 0).unwrap();
    assert_eq!(text, "c.mp4");
}

fn row_box(name: &str) -> Container {
    let row_box = Container::hbox("row_box");
    row_box.add_row([Control::line_edit("name", name)]).unwrap();
    row_box
}

fn overlay_name(grid: &Grid, row: usize) -> String {
    grid.row_widget_get(row, "row_box", "name")
        .unwrap()
        .value_get()
        .unwrap()
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_overlay_tags_follow_their_rows() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    for (row, name) in ["a", "b", "c"].into_iter().enumerate() {
        grid.value_set(row, 0, format!("{name}.mp4"), UserData::none()).unwrap();
        grid.row_widget_set(row, 1, row_box(name)).unwrap();
    }
    assert!(f.ctx.widget_exists(f.window_id, "files", "2|row_box"));
    assert_eq!(overlay_name(grid, 2), "c");

    grid.move_row_up(2).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert_eq!(overlay_name(grid, 1), "c");
    assert_eq!(overlay_name(grid, 2), "b");

    grid.move_row_down(0).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert_eq!(overlay_name(grid, 0), "c");
    assert_eq!(overlay_name(grid, 1), "a");

    grid.row_delete(0).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert_eq!(overlay_name(grid, 0), "a");
    assert_eq!(overlay_name(grid, 1), "b");
    assert!(!f.ctx.widget_exists(f.window_id, "files", "2|row_box"));
    assert!(matches!(grid.row_widget_get(2, "row_box", "name"), Err(Error::WidgetNotFound { .. })));

    grid.row_insert(0).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert_eq!(overlay_name(grid, 1), "a");
    assert_eq!(overlay_name(grid, 2), "b");
}

fn control_box() -> Container {
    let command_buttons = Container::hbox("command_buttons");
    command_buttons
        .add_row([Control::button("up", "Up"), Control::button("down", "Down")])
        .unwrap();
    let control_box = Container::vbox("control_box");
    control_box.add_row([command_buttons]).unwrap();
    control_box
}

#[test]
fn test_nested_overlay_scopes_are_per_row() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    for row in 0..2 {
        grid.value_set(row, 0, format!("{row}.mp4"), UserData::none()).unwrap();
        grid.row_widget_set(row, 1, control_box()).unwrap();
    }
    assert!(f.ctx.widget_exists(f.window_id, "0|control_box", "0|command_buttons"));
    assert!(f.ctx.widget_exists(f.window_id, "1|control_box", "1|command_buttons"));

    let up_0 = grid.row_widget_get(0, "command_buttons", "up").unwrap();
    let up_1 = grid.row_widget_get(1, "command_buttons", "up").unwrap();
    assert!(up_0.is_live());
    assert!(up_1.is_live());
    assert!(!up_0.ptr_eq(&up_1));
    assert_eq!(up_0.container_tag(), "0|command_buttons");

    grid.move_row_up(1).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert!(grid.row_widget_get(0, "command_buttons", "up").unwrap().ptr_eq(&up_1));
    assert!(grid.row_widget_get(1, "command_buttons", "up").unwrap().ptr_eq(&up_0));
    assert_eq!(up_0.container_tag(), "1|command_buttons");

    grid.row_delete(0).unwrap();
    assert!(grid.overlay_tags_consistent());
    assert!(!up_1.is_live());
    assert!(up_0.is_live());
    assert!(grid.row_widget_get(0, "command_buttons", "up").unwrap().ptr_eq(&up_0));
    assert!(!f.ctx.widget_exists(f.window_id, "1|control_box", "1|command_buttons"));
}

#[test]
fn test_replacing_and_clearing_overlays() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    grid.value_set(0, 0, "a.mp4", UserData::none()).unwrap();
    grid.row_widget_set(0, 1, row_box("first")).unwrap();
    grid.row_widget_set(0, 1, row_box("second")).unwrap();
    assert_eq!(overlay_name(grid, 0), "second");
    assert!(grid.row_container(0, 1).unwrap().is_some());

    grid.clear().unwrap();
    assert_eq!(grid.row_count().unwrap(), 0);
    assert!(!f.ctx.widget_exists(f.window_id, "files", "0|row_box"));
    assert_eq!(f.toolkit.grid_row_count(grid.widget().native()).unwrap(), 0);
}

#[test]
fn test_typing_buffer_flushes_once_per_commit_key() {
    let changes: Arc<Mutex<Vec<GridCellChange>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let control = Control::grid("files", columns()).with_callback(move |env| {
        if env.event() == EventKind::ClearTypingBuffer
            && let EventValue::Cell(change) = env.value()
        {
            sink.lock().push(change.clone());
        }
        EventResult::Accept
    });
    let f = fixture(control);
    f.grid
        .value_set(0, 0, "clip_a.mp4", UserData::new(PathBuf::from("/videos/clip_a.mp4")))
        .unwrap();

    f.toolkit.queue_keys("files", 0, 0, "intro");
    drain(&f.toolkit);

    let changes = changes.lock();
    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!((change.row, change.col), (0, 0));
    assert_eq!(change.new_text, "intro");
    assert_eq!(change.old_text, "clip_a.mp4");
    assert_eq!(change.prior_value, Some(Value::from("clip_a.mp4")));
    assert_eq!(
        change.user_data.downcast_ref::<PathBuf>(),
        Some(&PathBuf::from("/videos/clip_a.mp4"))
    );
    // The callback decides what to commit; it committed nothing.
    assert_eq!(f.grid.peek(0, 0).unwrap(), Some(Value::from("clip_a.mp4")));
    assert_eq!(f.grid.typing_buffer().unwrap(), None);
}

#[test]
fn test_focus_out_commits_without_callback() {
    let f = fixture(Control::grid("files", columns()));
    f.grid.value_set(0, 1, 90, UserData::none()).unwrap();

    for key in [KeyInput::Char('1'), KeyInput::Char('2'), KeyInput::Char('0')] {
        f.toolkit
            .queue_emit("files", NativeSignal::KeyPress, NativePayload::Key { row: 0, col: 1, key });
    }
    f.toolkit.queue_emit("files", NativeSignal::FocusOut, NativePayload::None);
    drain(&f.toolkit);

    assert_eq!(f.grid.peek(0, 1).unwrap(), Some(Value::Int(120)));
    assert_eq!(f.grid.previous_get(0, 1).unwrap(), Some(Value::Int(90)));
}

#[test]
fn test_moving_to_another_cell_flushes() {
    let f = fixture(Control::grid("files", columns()));
    f.grid.value_set(1, 0, "b.mp4", UserData::none()).unwrap();

    for (row, key) in [(0, KeyInput::Char('x')), (1, KeyInput::Char('y'))] {
        f.toolkit
            .queue_emit("files", NativeSignal::KeyPress, NativePayload::Key { row, col: 0, key });
    }
    drain(&f.toolkit);

    assert_eq!(f.grid.peek(0, 0).unwrap(), Some(Value::from("x")));
    assert_eq!(f.grid.typing_buffer().unwrap(), Some((1, 0, "y".to_string())));
}

#[test]
fn test_changed_rows_compare_with_original() {
    let f = fixture(Control::grid("files", columns()));
    let grid = &f.grid;
    grid.value_set(0, 0, "a.mp4", UserData::none()).unwrap();
    grid.value_set(1, 0, "b.mp4", UserData::none()).unwrap();
    assert!(!grid.changed().unwrap());

    f.toolkit.queue_cell_edit("files", 1, 0, "b_final.mp4");
    drain(&f.toolkit);
    assert_eq!(grid.changed_rows().unwrap(), vec![1]);

    // Writing the original value back undoes the change.
    grid.value_set(1, 0, "b.mp4", UserData::none()).unwrap();
    assert!(!grid.changed().unwrap());
}

#[test]
fn test_cell_edit_reports_change_without_committing() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let control = Control::grid("files", columns()).with_callback(move |env| {
        if let Some(change) = env.value().as_cell() {
            sink.lock().push((env.event(), change.old_text.clone(), change.new_text.clone()));
        }
        EventResult::Accept
    });
    let f = fixture(control);
    f.grid.value_set(0, 0, "a.mp4", UserData::none()).unwrap();

    f.toolkit.queue_cell_edit("files", 0, 0, "z.mp4");
    drain(&f.toolkit);

    assert_eq!(
        *seen.lock(),
        vec![(EventKind::Changed, "a.mp4".to_string(), "z.mp4".to_string())]
    );
    assert_eq!(f.grid.peek(0, 0).unwrap(), Some(Value::from("a.mp4")));
    assert_eq!(f.grid.read_and_commit(0, 0).unwrap(), Value::from("z.mp4"));
}
