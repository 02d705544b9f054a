use chrono::NaiveDate;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openparliament::config::AppConfig;
use openparliament::core::http_client::SourceClient;
use openparliament::features::activity::iter_recent;
use openparliament::features::politicians::MemberDetails;
use openparliament::features::politicians::service::ensure_membership;
use openparliament::features::sessions::Session;
use openparliament::features::votes::{Ballot, VoteResult, import_votes};
use openparliament::store::Store;

const VOTE_LIST_EN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ArrayOfVote>
  <Vote>
    <ParliamentNumber>44</ParliamentNumber>
    <SessionNumber>1</SessionNumber>
    <DecisionEventDateTime>2021-12-02T15:22:00</DecisionEventDateTime>
    <DecisionDivisionSubject>2nd reading of Bill C-8, An Act to implement the economic update</DecisionDivisionSubject>
    <DecisionResultName>Agreed To</DecisionResultName>
    <DecisionDivisionNumberOfYeas>2</DecisionDivisionNumberOfYeas>
    <DecisionDivisionNumberOfNays>2</DecisionDivisionNumberOfNays>
    <DecisionDivisionNumberOfPaired>0</DecisionDivisionNumberOfPaired>
    <DecisionDivisionNumber>1</DecisionDivisionNumber>
    <BillNumberCode>C-8</BillNumberCode>
  </Vote>
</ArrayOfVote>"#;

const VOTE_LIST_FR: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ArrayOfVote>
  <Vote>
    <ParliamentNumber>44</ParliamentNumber>
    <SessionNumber>1</SessionNumber>
    <DecisionEventDateTime>2021-12-02T15:22:00</DecisionEventDateTime>
    <DecisionDivisionSubject>2e lecture du projet de loi C-8</DecisionDivisionSubject>
    <DecisionResultName>Adoptée</DecisionResultName>
    <DecisionDivisionNumberOfYeas>2</DecisionDivisionNumberOfYeas>
    <DecisionDivisionNumberOfNays>2</DecisionDivisionNumberOfNays>
    <DecisionDivisionNumberOfPaired>0</DecisionDivisionNumberOfPaired>
    <DecisionDivisionNumber>1</DecisionDivisionNumber>
  </Vote>
</ArrayOfVote>"#;

fn participant(
    person_id: u32,
    first: &str,
    last: &str,
    party: &str,
    riding: &str,
    yea: bool,
) -> String {
    format!(
        r#"<VoteParticipant>
    <PersonId>{person_id}</PersonId>
    <PersonOfficialFirstName>{first}</PersonOfficialFirstName>
    <PersonOfficialLastName>{last}</PersonOfficialLastName>
    <ConstituencyName>{riding}</ConstituencyName>
    <ConstituencyProvinceTerritoryName>Ontario</ConstituencyProvinceTerritoryName>
    <CaucusShortName>{party}</CaucusShortName>
    <IsVoteYea>{yea}</IsVoteYea>
    <IsVoteNay>{nay}</IsVoteNay>
    <IsVotePaired>false</IsVotePaired>
  </VoteParticipant>"#,
        nay = !yea
    )
}

fn participants() -> String {
    let people = [
        participant(
            1001,
            "Anita",
            "Vandenbeld",
            "Liberal",
            "Ottawa West—Nepean",
            true,
        ),
        participant(1002, "Mona", "Fortier", "Liberal", "Ottawa—Vanier", true),
        participant(1003, "Marie-France", "Lalonde", "Liberal", "Orléans", false),
        participant(
            1004,
            "Pierre",
            "Poilievre",
            "Conservative",
            "Carleton",
            false,
        ),
    ];
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><ArrayOfVoteParticipant>{}</ArrayOfVoteParticipant>"#,
        people.join("")
    )
}

async fn mock_votes(server: &MockServer) {
    let routes = [
        ("/members/en/votes/xml", VOTE_LIST_EN.to_string()),
        ("/members/fr/votes/xml", VOTE_LIST_FR.to_string()),
        ("/members/en/votes/44/1/1/xml", participants()),
    ];
    for (route, body) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn imports_divisions_with_ballots_and_dissent() {
    let server = MockServer::start().await;
    mock_votes(&server).await;
    let dir = TempDir::new().expect("tempdir");
    let mut config = AppConfig::for_data_dir(dir.path());
    config.source_base = server.uri();
    let store = Store::temporary().expect("store");
    let source = SourceClient::new(true).expect("client");

    let session = Session::new(44, 1, NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"));
    store.save_session(&session).expect("session");
    let mut absentee = store.create_politician("Yasir Naqvi").expect("politician");
    let details = MemberDetails {
        first_name: "Yasir".into(),
        last_name: "Naqvi".into(),
        party: "Liberal".into(),
        riding: "Ottawa Centre".into(),
        province: Some("ON".into()),
    };
    ensure_membership(&mut absentee, &session, &details, session.start);
    store.save_politician(&absentee).expect("save");

    let summary = import_votes(&store, &source, &config)
        .await
        .expect("import");
    assert_eq!(summary.imported, 1);

    let vote = store.get_vote("44-1", 1).expect("lookup").expect("vote");
    assert_eq!(vote.result, VoteResult::Passed);
    assert_eq!(vote.description_fr, "2e lecture du projet de loi C-8");
    let bill = store
        .get_bill(vote.bill_id.expect("bill id"))
        .expect("lookup")
        .expect("bill");
    assert_eq!(bill.number, "C-8");

    let ballots = store.ballots_for("44-1", 1).expect("ballots");
    assert_eq!(ballots.len(), 5);
    let absent = ballots
        .iter()
        .find(|ballot| ballot.politician_id == absentee.id)
        .expect("absent ballot");
    assert_eq!(absent.vote, Ballot::Absent);
    assert!(!absent.dissent);

    let lalonde = store
        .politician_by_slug("marie-france-lalonde")
        .expect("lookup")
        .expect("politician");
    assert_eq!(lalonde.parl_mp_id, Some(1003));
    let dissenter = ballots
        .iter()
        .find(|ballot| ballot.politician_id == lalonde.id)
        .expect("ballot");
    assert!(dissenter.dissent);

    let liberal = vote
        .party_votes
        .iter()
        .find(|party_vote| party_vote.party == "Liberal")
        .expect("liberal position");
    assert_eq!(liberal.vote, Ballot::Yes);

    let feed = iter_recent(store.public_activities_for(lalonde.id).expect("activities"));
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].variety, "membervote");

    let again = import_votes(&store, &source, &config)
        .await
        .expect("import");
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 1);
}
