//! Behavioural coverage for the file and paginated join pipeline.

use std::cell::RefCell;

use boundary_join_core::{GeometryStore, JoinOptions, SpatialJoinEngine};
use boundary_join_data::test_support::StubPageFetcher;
use boundary_join_data::{
    GeoJsonBoundarySource, JOIN_ERROR_ATTRIBUTE, JsonLinesSink, JsonRecordSource,
    PagedRecordSource,
};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use tempfile::TempDir;

const ID_FIELD: &str = "CounDist";
const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone)]
enum RecordInput {
    File(Utf8PathBuf),
    Pages(StubPageFetcher),
}

#[derive(Debug)]
struct Workspace {
    dir: TempDir,
    boundaries: Option<Utf8PathBuf>,
    records: Option<RecordInput>,
}

impl Workspace {
    fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf8 temp path")
    }
}

#[derive(Debug)]
struct Output {
    root: Utf8PathBuf,
    requests: Vec<(usize, usize)>,
}

#[fixture]
fn workspace() -> RefCell<Workspace> {
    RefCell::new(Workspace {
        dir: TempDir::new().expect("create temporary directory"),
        boundaries: None,
        records: None,
    })
}

#[fixture]
fn output() -> RefCell<Option<Output>> {
    RefCell::new(None)
}

fn district(id: &str, min_x: f64, max_x: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": {ID_FIELD: id},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[min_x, 0.0], [max_x, 0.0], [max_x, 10.0], [min_x, 10.0], [min_x, 0.0]]]
        }
    })
}

fn point(id: u32, longitude: f64) -> Value {
    json!({"id": id, "longitude": longitude, "latitude": 5.0})
}

fn read_set(root: &Utf8Path, stem: &str) -> Vec<Value> {
    std::fs::read_to_string(root.join(format!("{stem}.jsonl")))
        .expect("read result set")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

fn with_output<T>(output: &RefCell<Option<Output>>, check: impl FnOnce(&Output) -> T) -> T {
    let binding = output.borrow();
    let Some(run) = binding.as_ref() else {
        panic!("the join must run first");
    };
    check(run)
}

#[given("a boundary file with districts \"1\" and \"2\"")]
fn boundary_file(#[from(workspace)] workspace: &RefCell<Workspace>) {
    let mut state = workspace.borrow_mut();
    let path = state.path("districts.geojson");
    let document = json!({
        "type": "FeatureCollection",
        "features": [district("1", 0.0, 10.0), district("2", 10.0, 20.0)]
    });
    std::fs::write(&path, document.to_string()).expect("write boundaries");
    state.boundaries = Some(path);
}

#[given("a record file with one record in each district and one outside")]
fn record_file(#[from(workspace)] workspace: &RefCell<Workspace>) {
    let mut state = workspace.borrow_mut();
    let path = state.path("crashes.json");
    let records = json!([point(1, 5.0), point(2, 15.0), point(3, 30.0)]);
    std::fs::write(&path, records.to_string()).expect("write records");
    state.records = Some(RecordInput::File(path));
}

#[given("a paginated record service with two pages of two records")]
fn paged_records(#[from(workspace)] workspace: &RefCell<Workspace>) {
    let fetcher = StubPageFetcher::with_pages(vec![
        vec![point(1, 5.0), point(2, 6.0)],
        vec![point(3, 15.0), point(4, 30.0)],
    ]);
    workspace.borrow_mut().records = Some(RecordInput::Pages(fetcher));
}

#[when("I run the join into an output directory")]
fn run_join(
    #[from(workspace)] workspace: &RefCell<Workspace>,
    #[from(output)] output: &RefCell<Option<Output>>,
) {
    let state = workspace.borrow();
    let boundaries = state.boundaries.clone().expect("boundaries configured");
    let mut boundary_source = GeoJsonBoundarySource::from_path(boundaries);
    let store = GeometryStore::load(&mut boundary_source, ID_FIELD).expect("boundaries load");
    let engine = SpatialJoinEngine::new(store, JoinOptions::default());

    let mut requests = Vec::new();
    let results = match state.records.clone().expect("records configured") {
        RecordInput::File(path) => engine
            .join_source(&mut JsonRecordSource::new(path))
            .expect("records load"),
        RecordInput::Pages(fetcher) => {
            let mut source = PagedRecordSource::new(fetcher, PAGE_SIZE).expect("page size");
            let results = engine.join_source(&mut source).expect("pages load");
            requests = source.fetcher().requests().to_vec();
            results
        }
    };

    let root = state.path("out");
    let mut sink = JsonLinesSink::create(root.clone()).expect("create sink");
    results.publish(&mut sink).expect("publish results");
    *output.borrow_mut() = Some(Output { root, requests });
}

#[then("the output directory holds a set for each district")]
fn district_sets(#[from(output)] output: &RefCell<Option<Output>>) {
    with_output(output, |run| {
        assert_eq!(
            read_set(&run.root, "matched_region_0_1"),
            vec![json!({"id": 1, "longitude": 5.0, "latitude": 5.0, "region": "1"})]
        );
        assert_eq!(
            read_set(&run.root, "matched_region_1_2"),
            vec![json!({"id": 2, "longitude": 15.0, "latitude": 5.0, "region": "2"})]
        );
    });
}

#[then("the overall matched set holds two records")]
fn two_matched(#[from(output)] output: &RefCell<Option<Output>>) {
    with_output(output, |run| {
        assert_eq!(read_set(&run.root, "matched_overall").len(), 2);
    });
}

#[then("the overall matched set holds three records")]
fn three_matched(#[from(output)] output: &RefCell<Option<Output>>) {
    with_output(output, |run| {
        assert_eq!(read_set(&run.root, "matched_overall").len(), 3);
    });
}

#[then("the unmatched set explains why its record was not matched")]
fn unmatched_reason(#[from(output)] output: &RefCell<Option<Output>>) {
    with_output(output, |run| {
        let unmatched = read_set(&run.root, "unmatched");
        let reasons: Vec<_> = unmatched
            .iter()
            .map(|entry| entry.get(JOIN_ERROR_ATTRIBUTE).cloned())
            .collect();
        assert_eq!(reasons, vec![Some(json!("outside_all_regions"))]);
    });
}

#[then("the record service was asked for three pages")]
fn three_pages(#[from(output)] output: &RefCell<Option<Output>>) {
    with_output(output, |run| {
        assert_eq!(run.requests, vec![(0, 2), (2, 2), (4, 2)]);
    });
}

#[scenario(path = "tests/features/file_pipeline.feature", index = 0)]
fn file_records_to_region_sets(workspace: RefCell<Workspace>, output: RefCell<Option<Output>>) {
    let _ = (workspace, output);
}

#[scenario(path = "tests/features/file_pipeline.feature", index = 1)]
fn paginated_records_to_region_sets(
    workspace: RefCell<Workspace>,
    output: RefCell<Option<Output>>,
) {
    let _ = (workspace, output);
}
