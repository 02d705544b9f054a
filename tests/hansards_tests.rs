use chrono::NaiveDate;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openparliament::config::AppConfig;
use openparliament::core::error::AppError;
use openparliament::core::http_client::SourceClient;
use openparliament::features::activity::iter_recent;
use openparliament::features::hansards::alpheus::parse_string;
use openparliament::features::hansards::{
    DocumentType, ImportOptions, fetch_latest_debates, import_document,
};
use openparliament::features::politicians::MemberDetails;
use openparliament::features::politicians::service::ensure_membership;
use openparliament::features::sessions::Session;
use openparliament::store::Store;

const HANSARD_EN: &str = include_str!("fixtures/hansard-en.xml");
const HANSARD_FR: &str = include_str!("fixtures/hansard-fr.xml");

fn session() -> Session {
    Session::new(44, 1, NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"))
}

fn seed(store: &Store) -> Session {
    let session = session();
    store.save_session(&session).expect("session");

    let mut smith = store.create_politician("John Smith").expect("politician");
    let details = MemberDetails {
        first_name: "John".into(),
        last_name: "Smith".into(),
        party: "Liberal".into(),
        riding: "Ottawa Centre".into(),
        province: Some("ON".into()),
    };
    ensure_membership(&mut smith, &session, &details, session.start);
    store.save_politician(&smith).expect("save politician");
    session
}

async fn mock_sitting(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Content/House/441/Debates/001/HAN001-E.XML"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HANSARD_EN))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Content/House/441/Debates/001/HAN001-F.XML"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HANSARD_FR))
        .mount(server)
        .await;
}

fn config_for(dir: &TempDir, server: &MockServer) -> AppConfig {
    let mut config = AppConfig::for_data_dir(dir.path());
    config.source_base = server.uri();
    config.disable_proxy = true;
    config
}

#[test]
fn parses_both_languages_of_the_fixture() {
    let english = parse_string(HANSARD_EN).expect("english");
    let french = parse_string(HANSARD_FR).expect("french");

    assert_eq!(english.meta.document_number, "1");
    assert_eq!(english.statements.len(), 2);
    assert_eq!(french.statements.len(), 2);
    assert_eq!(
        english.statements[0].h2.as_deref(),
        Some("Affordable Housing")
    );
    assert_eq!(
        english.statements[0].timestamp.expect("time").to_string(),
        "2021-11-23 10:00:00"
    );
    assert_eq!(french.statements[0].id, english.statements[0].id);
    assert!(french.statements[1].content.contains("les loyers"));
}

#[tokio::test]
async fn fetches_new_sittings_until_one_is_missing() {
    let server = MockServer::start().await;
    mock_sitting(&server).await;
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&dir, &server);
    let store = Store::temporary().expect("store");
    let source = SourceClient::new(true).expect("client");
    let session = seed(&store);

    let fetched = fetch_latest_debates(&store, &source, &config, &session)
        .await
        .expect("fetch");
    assert_eq!(fetched, 1);

    let document = store
        .document_by_source_id(11392501)
        .expect("lookup")
        .expect("document");
    assert!(document.downloaded);
    assert!(!document.public);
    assert_eq!(document.document_type, DocumentType::Debate);
    assert!(dir.path().join("document_cache/11392501-fr.xml").exists());

    // The same sitting is never downloaded twice.
    let again = fetch_latest_debates(&store, &source, &config, &session)
        .await
        .expect("fetch");
    assert_eq!(again, 0);
}

#[tokio::test]
async fn imports_a_bilingual_debate() {
    let server = MockServer::start().await;
    mock_sitting(&server).await;
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&dir, &server);
    let store = Store::temporary().expect("store");
    let source = SourceClient::new(true).expect("client");
    let session = seed(&store);

    fetch_latest_debates(&store, &source, &config, &session)
        .await
        .expect("fetch");
    let document = store
        .document_by_source_id(11392501)
        .expect("lookup")
        .expect("document");

    let imported = import_document(&store, &config, document, ImportOptions::default())
        .await
        .expect("import");
    assert!(imported.public);
    assert!(imported.multilingual);
    assert_eq!(imported.date, NaiveDate::from_ymd_opt(2021, 11, 23));
    assert_eq!(imported.most_frequent_word, "housing");
    assert_eq!(
        imported.absolute_url().as_deref(),
        Some("/debates/2021/11/23/")
    );

    let statements = store.statements_for(imported.id).expect("statements");
    assert_eq!(statements.len(), 2);

    let first = &statements[0];
    assert_eq!(
        first.politician.as_ref().map(|p| p.slug.as_str()),
        Some("john-smith")
    );
    assert_eq!(first.slug, "john-smith-1");
    assert_eq!(first.urlcache, "/debates/2021/11/23/john-smith-1/");
    assert_eq!(first.h2_fr, "Logement abordable");
    assert!(first.content_fr.contains("Ottawa-Centre"));
    assert!(!first.procedural);
    assert!(statements[1].politician.is_none());

    let smith = store
        .politician_by_slug("john-smith")
        .expect("lookup")
        .expect("politician");
    assert_eq!(smith.parl_affil_id, Some(25446));
    let feed = iter_recent(store.public_activities_for(smith.id).expect("activities"));
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].variety, "statement");

    // A second import needs to be forced.
    let err = import_document(&store, &config, imported.clone(), ImportOptions::default())
        .await
        .expect_err("refused");
    assert!(matches!(err, AppError::BadRequest(_)));

    let forced = ImportOptions {
        force: true,
        ..ImportOptions::default()
    };
    import_document(&store, &config, imported.clone(), forced)
        .await
        .expect("forced import");
    assert_eq!(
        store.statements_for(imported.id).expect("statements").len(),
        2
    );
}
