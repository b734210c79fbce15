use scoharvest_core::RunLog;
use scoharvest_scopus::RecordKind;
use scoharvest_scopus::extract::{KindScanners, TagScanner};
use scoharvest_scopus::record::RowAssembler;

/// Synthetic COMPLETE-view response with 25 entries
fn sample_feed() -> String {
    let entries: String = (0..25)
        .map(|i| {
            format!(
                r#"<entry><eid>2-s2.0-850000000{i:02}</eid><prism:doi>10.1000/{i}</prism:doi>
<dc:title>Title {i} &amp; more</dc:title><prism:issn>12345678</prism:issn>
<author-count limit="100" total="3">3</author-count>
<affiliation><affilname>University {i}</affilname><afid>6000{i:04}</afid></affiliation>
<author seq="1"><authid>1{i}</authid><authname>Doe J.</authname><afid>6000{i:04}</afid></author>
<author seq="2"><authid>2{i}</authid><authname>Roe R.</authname><afid>6000{i:04}</afid></author>
<author seq="3"><authid>3{i}</authid><authname>Poe P.</authname><afid>6000{i:04}</afid></author>
</entry>"#
            )
        })
        .collect();
    format!(
        "<search-results><opensearch:totalResults>25</opensearch:totalResults>{entries}</search-results>"
    )
}

#[divan::bench]
fn scan_entries(bencher: divan::Bencher) {
    let feed = sample_feed();
    let scanner = TagScanner::new("<entry>", "</entry>").unwrap();
    bencher.bench(|| scanner.scan(divan::black_box(&feed)).unwrap());
}

#[divan::bench]
fn assemble_publication_batch(bencher: divan::Bencher) {
    let feed = sample_feed();
    let dir = tempfile::tempdir().unwrap();
    let log = RunLog::open(dir.path()).unwrap();
    let scanners = KindScanners::new(RecordKind::Publications).unwrap();
    let assembler = RowAssembler::new(RecordKind::Publications, &scanners, &log, 25, 5);
    bencher.bench(|| assembler.assemble(divan::black_box(&feed), "bench").unwrap());
}

fn main() {
    divan::main();
}
