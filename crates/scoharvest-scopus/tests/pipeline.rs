//! End-to-end runs against a scripted search service
//!
//! The fake answers each query URL with the entries it knows for the queried
//! identifiers, so pass bookkeeping, replay and output files can be checked
//! without a network.

use std::collections::VecDeque;
use std::path::Path;

use scoharvest_core::{Backoff, FailureClass, Fetch, FetchError, ProgressContext};
use scoharvest_scopus::{Config, RecordKind, run};
use tempfile::TempDir;

/// Canned answer for one request
enum Reply {
    Status(u16),
    Network,
    Body(String),
}

struct FakeScopus {
    kind: RecordKind,
    /// Identifiers the service knows about
    known: Vec<String>,
    /// Answers for the first requests, in order
    script: VecDeque<Reply>,
    /// Identifiers added to every answer without being queried
    unasked: Vec<String>,
    urls: Vec<String>,
}

impl FakeScopus {
    fn new(kind: RecordKind, known: &[String]) -> Self {
        Self {
            kind,
            known: known.to_vec(),
            script: VecDeque::new(),
            unasked: Vec::new(),
            urls: Vec::new(),
        }
    }

    fn authors(known: &[String]) -> Self {
        Self::new(RecordKind::Authors, known)
    }

    fn scripted(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script.extend(replies);
        self
    }

    fn failing_first(self, statuses: &[u16]) -> Self {
        self.scripted(statuses.iter().map(|&s| Reply::Status(s)))
    }

    fn with_unasked(mut self, ids: &[&str]) -> Self {
        self.unasked = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn entry(&self, id: &str) -> String {
        match self.kind {
            RecordKind::Authors => author_entry(id),
            RecordKind::Publications => publication_entry(id),
        }
    }
}

fn queried_ids(url: &str, kind: RecordKind) -> Vec<String> {
    url.split(&format!("{}%28", kind.query_field()))
        .skip(1)
        .filter_map(|part| part.split("%29").next())
        .map(str::to_string)
        .collect()
}

fn author_entry(id: &str) -> String {
    format!(
        "<entry><dc:identifier>AUTHOR_ID:{id}</dc:identifier>\
         <preferred-name><surname>Surname{id}</surname><given-name>Given</given-name><initials>G.</initials></preferred-name>\
         <affiliation-name>Example University</affiliation-name></entry>"
    )
}

fn publication_entry(eid: &str) -> String {
    format!(
        r#"<entry><eid>{eid}</eid><prism:doi>10.1000/{eid}</prism:doi><dc:title>Title of {eid}</dc:title>
<prism:issn>12345678</prism:issn><prism:eIssn>8765432X</prism:eIssn>
<author-count limit="100" total="2">2</author-count>
<affiliation><affilname>Example University</affilname><afid>60000001</afid></affiliation>
<author seq="1"><authid>111</authid><authname>Doe J.</authname><afid>60000001</afid></author>
<author seq="2"><authid>222</authid><authname>Roe R.</authname><afid>60000001</afid><afid>60000002</afid></author>
</entry>"#
    )
}

fn feed(total: usize, entries: &str) -> String {
    format!(
        "<search-results><opensearch:totalResults>{total}</opensearch:totalResults>{entries}</search-results>"
    )
}

impl Fetch for FakeScopus {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        self.urls.push(url.to_string());
        match self.script.pop_front() {
            Some(Reply::Status(status)) => {
                return Err(FetchError::Http {
                    status,
                    message: "scripted failure".to_string(),
                });
            }
            Some(Reply::Network) => {
                return Err(FetchError::Network {
                    message: "connection reset".to_string(),
                });
            }
            Some(Reply::Body(body)) => return Ok(body),
            None => {}
        }
        let queried = queried_ids(url, self.kind);
        let entries: Vec<String> = queried
            .iter()
            .filter(|id| self.known.contains(id))
            .chain(self.unasked.iter())
            .map(|id| self.entry(id))
            .collect();
        Ok(feed(entries.len(), &entries.concat()))
    }
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("5720{i:07}")).collect()
}

fn eids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("2-s2.0-8500000{i:04}")).collect()
}

fn setup(input: &[String]) -> (TempDir, Config) {
    setup_kind(RecordKind::Authors, input)
}

fn setup_kind(kind: RecordKind, input: &[String]) -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("ids.txt");
    std::fs::write(&input_path, input.join("\n")).unwrap();
    let config = Config {
        kind,
        input: input_path,
        output_dir: dir.path().join("out"),
        api_key: "test-key".to_string(),
        base_url: "http://scopus.test/content/search/".to_string(),
        backoff: Backoff::none(),
        ..Default::default()
    };
    (dir, config)
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn read_log(config: &Config, file: &str) -> String {
    std::fs::read_to_string(config.log_dir().join(file)).unwrap()
}

/// Every record, checked against the header length
fn csv_records(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().clone();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    for record in &records {
        assert_eq!(record.len(), header.len(), "{record:?}");
    }
    (header, records)
}

fn csv_ids(path: &Path) -> Vec<String> {
    csv_records(path).1.iter().map(|r| r[0].to_string()).collect()
}

#[test]
fn harvests_everything_in_one_pass() {
    let input = ids(30);
    let (_dir, config) = setup(&input);
    let mut fake = FakeScopus::authors(&input);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(fake.urls.len(), 2);
    assert_eq!(queried_ids(&fake.urls[0], RecordKind::Authors).len(), 25);
    assert_eq!(queried_ids(&fake.urls[1], RecordKind::Authors).len(), 5);
    assert_eq!(summary.rows_written, 30);
    assert_eq!(summary.unresolved, 0);
    assert!(summary.pass2.is_none());
    assert_eq!(summary.requests, 2);
    assert!(summary.fetch_failures.is_empty());

    let mut written = csv_ids(&summary.output_csv);
    written.sort();
    assert_eq!(written, input);

    let out = &config.output_dir;
    assert!(read_lines(&out.join("unresolved_ids.txt")).is_empty());
    assert_eq!(read_lines(&out.join("successful_ids_pass1.txt")).len(), 30);
    assert!(out.join("author_name_variants.csv").exists());
    assert!(out.join("logs/xml_mismatch.txt").exists());
    let report = std::fs::read_to_string(out.join("final_summary.txt")).unwrap();
    assert!(report.contains("Rows written: 30"));
}

#[test]
fn never_returned_identifier_is_unresolved() {
    let input = ids(4);
    let (_dir, config) = setup(&input);
    let mut fake = FakeScopus::authors(&input[..3]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    // pass 1, pass 2 (empty result), replay
    assert_eq!(summary.requests, 3);
    assert_eq!(
        queried_ids(&fake.urls[1], RecordKind::Authors),
        vec![input[3].clone()]
    );
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.pass1.failed, 1);

    let out = &config.output_dir;
    assert_eq!(read_lines(&out.join("failed_ids_pass1.txt")), vec![input[3].clone()]);
    assert_eq!(read_lines(&out.join("unresolved_ids.txt")), vec![input[3].clone()]);
    let problems = read_log(&config, "problem_urls_pass2.txt");
    assert_eq!(problems.matches("apiKey=***").count(), 2);
    assert!(!problems.contains("test-key"));
}

#[test]
fn server_error_recovered_in_second_pass() {
    let input = ids(30);
    let (_dir, config) = setup(&input);
    let mut fake = FakeScopus::authors(&input).failing_first(&[500]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.pass1.failed_batches, 1);
    assert_eq!(summary.pass1.failed, 25);
    let pass2 = summary.pass2.as_ref().unwrap();
    assert_eq!(pass2.ids, 25);
    assert_eq!(pass2.succeeded, 25);
    assert_eq!(summary.recovered(), 25);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.rows_written, 30);
    assert_eq!(summary.fetch_failures, vec![(FailureClass::ServerError, 1)]);

    assert!(read_log(&config, "http_500_server_error.txt").contains("HTTP 500"));
}

#[test]
fn replay_recovers_second_pass_failure() {
    let input = ids(10);
    let (_dir, config) = setup(&input);
    // pass 1 quota error, pass 2 quota error, replay succeeds
    let mut fake = FakeScopus::authors(&input).failing_first(&[400, 400]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.requests, 3);
    assert_eq!(summary.replay_recovered, 10);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.rows_written, 10);
    assert_eq!(summary.fetch_failures, vec![(FailureClass::QuotaExceeded, 2)]);
}

#[test]
fn each_failure_class_has_its_own_log() {
    let input = ids(6);
    let (_dir, mut config) = setup(&input);
    config.page_size = 2;
    let mut fake = FakeScopus::authors(&input).scripted([
        Reply::Status(404),
        Reply::Status(418),
        Reply::Network,
    ]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.pass1.failed_batches, 3);
    assert_eq!(summary.pass1.failed, 6);
    assert_eq!(
        summary.fetch_failures,
        vec![
            (FailureClass::NotFound, 1),
            (FailureClass::OtherHttp, 1),
            (FailureClass::NonHttp, 1),
        ]
    );
    assert_eq!(
        read_lines(&config.output_dir.join("failed_ids_pass1.txt")),
        input
    );

    let not_found = read_log(&config, "http_404_invalid_query.txt");
    assert!(not_found.contains("HTTP 404"));
    assert!(not_found.contains(&format!("au-id%28{}%29", input[0])));
    let other = read_log(&config, "http_other.txt");
    assert!(other.contains("HTTP 418"));
    assert!(other.contains(&format!("au-id%28{}%29", input[2])));
    let network = read_log(&config, "network_error.txt");
    assert!(network.contains("network error: connection reset"));
    assert!(network.contains(&format!("au-id%28{}%29", input[4])));
    for log in [&not_found, &other, &network] {
        assert!(!log.contains("test-key"));
    }
    assert!(!read_log(&config, "http_500_server_error.txt").contains("HTTP"));
    assert_eq!(read_log(&config, "problem_urls_pass1.txt").matches("apiKey=***").count(), 3);

    let pass2 = summary.pass2.as_ref().unwrap();
    assert_eq!(pass2.succeeded, 6);
    assert_eq!(summary.unresolved, 0);
}

#[test]
fn tag_mismatch_fails_batch_until_second_pass() {
    let input = ids(3);
    let (_dir, config) = setup(&input);
    // the last entry never closes
    let broken = feed(
        3,
        &format!(
            "{}{}<entry><dc:identifier>AUTHOR_ID:{}</dc:identifier>",
            author_entry(&input[0]),
            author_entry(&input[1]),
            input[2]
        ),
    );
    let mut fake = FakeScopus::authors(&input).scripted([Reply::Body(broken)]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.requests, 2);
    assert_eq!(summary.pass1.failed_batches, 1);
    assert_eq!(summary.pass1.rows_written, 0);
    assert!(summary.fetch_failures.is_empty());
    assert_eq!(
        read_lines(&config.output_dir.join("failed_ids_pass1.txt")),
        input
    );

    let mismatch = read_log(&config, "xml_mismatch.txt");
    assert_eq!(mismatch.matches("Attempt ").count(), 5);
    assert!(mismatch.contains("FAILED 5 TIMES for entries 1-3"));
    assert!(mismatch.contains("3 <entry> but 2 </entry>"));
    assert_eq!(read_log(&config, "problem_urls_pass1.txt").matches("apiKey=***").count(), 1);

    assert_eq!(summary.pass2.as_ref().unwrap().succeeded, 3);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.unresolved, 0);
}

#[test]
fn publications_rows_match_header() {
    let input = eids(3);
    let (_dir, config) = setup_kind(RecordKind::Publications, &input);
    let mut fake = FakeScopus::new(RecordKind::Publications, &input);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.requests, 1);
    assert!(fake.urls[0].contains("/scopus?"));
    assert!(fake.urls[0].contains("view=COMPLETE"));
    assert_eq!(queried_ids(&fake.urls[0], RecordKind::Publications), input);

    let (header, records) = csv_records(&summary.output_csv);
    assert_eq!(header.len(), RecordKind::Publications.header().len());
    assert_eq!(&header[0], "PubEID");
    assert_eq!(records.len(), 3);
    let issn = header.iter().position(|h| h == "PubISSN").unwrap();
    let eissn = header.iter().position(|h| h == "Pub_eISSN").unwrap();
    for record in &records {
        assert_eq!(&record[issn], "1234-5678");
        assert_eq!(&record[eissn], "8765-432X");
    }
    assert!(!config.log_dir().join("#EIDs_with_invalid_issn.txt").exists());

    let out = &config.output_dir;
    assert_eq!(read_lines(&out.join("publication_authors.csv")).len(), 1 + 6);
    let pairs = read_lines(&out.join("publication_author_affiliations.csv"));
    assert_eq!(pairs[0], "EID,AuthorID,AfilliationID");
    assert_eq!(pairs.len(), 1 + 3 * 3);
    assert!(pairs.contains(&format!("{},222,60000002", input[0])));
    let report = std::fs::read_to_string(out.join("final_summary.txt")).unwrap();
    assert!(report.contains("Detail rows (author affiliations): 9"));
}

#[test]
fn unasked_records_do_not_count_as_successes() {
    let input = ids(3);
    let (_dir, config) = setup(&input);
    let mut fake = FakeScopus::authors(&input).with_unasked(&["57209999999"]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.pass1.succeeded, 3);
    assert_eq!(summary.pass1.failed, 0);
    assert_eq!(summary.unresolved, 0);
    assert!(summary.pass2.is_none());
}

#[test]
fn single_pass_leaves_failures_unresolved() {
    let input = ids(10);
    let (_dir, mut config) = setup(&input);
    config.second_pass = false;
    let mut fake = FakeScopus::authors(&input).failing_first(&[404]);

    let summary = run(&config, &mut fake, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.requests, 1);
    assert!(summary.pass2.is_none());
    assert_eq!(summary.unresolved, 10);
    assert!(!config.output_dir.join("successful_ids_pass2.txt").exists());
}

#[test]
fn missing_api_key_rejected() {
    let input = ids(1);
    let (_dir, mut config) = setup(&input);
    config.api_key = String::new();
    let mut fake = FakeScopus::authors(&input);

    assert!(run(&config, &mut fake, &ProgressContext::hidden()).is_err());
    assert!(fake.urls.is_empty());
}
