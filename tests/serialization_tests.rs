use broadside::store::{MatchStore, MemoryStore};
use broadside::{
    AiKind, Cell, Grid, Move, Orientation, Participant, PlacementRecord, ShotClass, GRID_SIZE,
};
use serde_json::json;

#[test]
fn grid_is_a_matrix_of_codes() {
    let mut grid = Grid::new();
    grid.set_cell(0, 0, Cell::ShipBody);
    grid.set_cell(0, 1, Cell::Hit);
    grid.set_cell(0, 2, Cell::Miss);
    grid.set_cell(0, 3, Cell::Sunk);
    let value = serde_json::to_value(&grid).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), GRID_SIZE);
    assert_eq!(rows[0], json!([1, 2, 3, 4, 0, 0, 0, 0, 0, 0]));
    assert_eq!(grid.to_codes()[0], vec![1, 2, 3, 4, 0, 0, 0, 0, 0, 0]);

    let back: Grid = serde_json::from_value(value).unwrap();
    assert_eq!(back, grid);
}

#[test]
fn unknown_cell_code_is_rejected() {
    let mut rows = vec![vec![0u8; GRID_SIZE]; GRID_SIZE];
    rows[2][2] = 7;
    assert!(serde_json::from_value::<Grid>(json!(rows)).is_err());
}

#[test]
fn ship_map_keeps_positions_and_sunk_flag() {
    let mut record = PlacementRecord::new();
    record.place(1, 1, 2, Orientation::Vertical, "Destroyer").unwrap();
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["ships"]["Destroyer"]["positions"], json!([[1, 1], [2, 1]]));
    assert_eq!(value["ships"]["Destroyer"]["sunk"], json!(false));
    assert_eq!(value["grid"][2][1], json!(1));
}

#[test]
fn move_fields_serialize_plainly() {
    let mv = Move {
        id: 3,
        match_id: 1,
        attacker: "ann".into(),
        target: "ben".into(),
        x: 4,
        y: 5,
        prev_cell: Cell::ShipBody,
        result: ShotClass::Sunk,
        sunk_ship: Some("Cruiser".into()),
        turn: Some("ann".into()),
        reverted: false,
    };
    let value = serde_json::to_value(&mv).unwrap();
    assert_eq!(value["prev_cell"], json!(1));
    assert_eq!(value["result"], json!("sunk"));
    assert_eq!(value["sunk_ship"], json!("Cruiser"));
    assert_eq!(
        serde_json::to_value(ShotClass::AlreadyHit).unwrap(),
        json!("already_hit")
    );
}

#[test]
fn participants_are_tagged_by_kind() {
    let bot = Participant::ai("bot", AiKind::DensityWeighted);
    assert_eq!(
        serde_json::to_value(&bot).unwrap(),
        json!({"ai": {"name": "bot", "kind": "density_weighted"}})
    );
    assert_eq!(
        serde_json::to_value(Participant::human("ann")).unwrap(),
        json!({"human": {"name": "ann"}})
    );
}

#[test]
fn store_round_trips_records() {
    let store = MemoryStore::new();
    let mut record = PlacementRecord::new();
    record.place(0, 0, 5, Orientation::Horizontal, "Carrier").unwrap();
    store.save_placement(1, "ann", &record).unwrap();
    assert_eq!(store.load_placement(1, "ann").unwrap(), Some(record));
    assert_eq!(store.load_placement(1, "ben").unwrap(), None);

    let bot = Participant::ai("bot", AiKind::UniformRandom);
    let game = broadside::Match::new(store.next_match_id().unwrap(), Participant::human("ann"), Some(bot));
    store.save_match(&game).unwrap();
    assert_eq!(store.load_match(game.id).unwrap(), Some(game));
}
