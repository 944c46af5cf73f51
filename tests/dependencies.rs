//! Dependency installer end-to-end tests
//!
//! Every test runs against the in-memory filesystem, an in-memory gateway
//! per network and a scripted prompter.

use std::path::Path;
use std::sync::Arc;

use flowkit::dependencies::{Answer, Installer, InstallerOptions, ScriptedPrompter};
use flowkit::fs::{MemoryFs, ReaderWriter};
use flowkit::gateway::{Gateways, MemoryGateway};
use flowkit::{Address, Checksum, FlowError, Manifest};

const HELLO: &str = include_str!("fixtures/chain/Hello.cdc");
const FOO: &str = include_str!("fixtures/chain/Foo.cdc");
const BAR: &str = include_str!("fixtures/chain/Bar.cdc");
const LOOP: &str = include_str!("fixtures/chain/Loop.cdc");
const NAMED: &str = include_str!("fixtures/chain/Named.cdc");

const HELLO_ADDRESS: &str = "8efde57e98c557fa";

fn address(hex: &str) -> Address {
    Address::from_hex(hex).unwrap()
}

fn testnet(gateway: &Arc<MemoryGateway>) -> Gateways {
    Gateways::new().with("testnet", gateway.clone())
}

fn read(fs: &MemoryFs, path: &str) -> String {
    fs.read_to_string(Path::new(path)).unwrap()
}

fn saved_manifest(fs: &MemoryFs) -> Manifest {
    Manifest::load(fs, Path::new("flow.json")).unwrap()
}

fn quiet() -> InstallerOptions {
    InstallerOptions {
        skip_deployments: true,
        skip_alias: true,
    }
}

/// Install `source` into `fs` with no prompts expected
async fn add(fs: &MemoryFs, gateways: &Gateways, source: &str) -> Result<(), FlowError> {
    let prompter = ScriptedPrompter::new([]);
    let manifest = if fs.exists(Path::new("flow.json")) {
        saved_manifest(fs)
    } else {
        Manifest::default()
    };
    let mut installer =
        Installer::new(fs, gateways, &prompter, manifest, "flow.json").with_options(quiet());
    installer.add_by_source_string(source).await
}

// =============================================================================
// Installing
// =============================================================================

#[tokio::test]
async fn test_install_single_dependency() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
    installer
        .add_by_source_string("testnet://8efde57e98c557fa.Hello")
        .await
        .unwrap();

    assert_eq!(read(&fs, "imports/8efde57e98c557fa/Hello.cdc"), HELLO);

    let manifest = saved_manifest(&fs);
    assert_eq!(manifest.dependencies.len(), 1);
    let hello = manifest.dependency("Hello").unwrap();
    assert_eq!(hello.hash, Checksum::from_bytes(HELLO.as_bytes()));
    assert_eq!(hello.aliases["testnet"], address(HELLO_ADDRESS));
    assert_eq!(hello.source.to_string(), "testnet://8efde57e98c557fa.Hello");
    assert!(manifest.validate().is_empty());

    let contract = manifest.contract("Hello").unwrap();
    assert!(contract.is_dependency);
    assert_eq!(
        contract.location.as_deref(),
        Some(Path::new("imports/8efde57e98c557fa/Hello.cdc"))
    );

    // the mainnet alias was asked for and skipped
    assert_eq!(prompter.questions().len(), 1);
    assert_eq!(installer.logs().file_system_actions.len(), 1);
    assert_eq!(installer.logs().state_updates, vec!["Hello added to flow.json"]);
}

#[tokio::test]
async fn test_manifest_json_uses_object_sources() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    add(&fs, &testnet(&gateway), "testnet://8efde57e98c557fa.Hello")
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&read(&fs, "flow.json")).unwrap();
    let hello = &json["dependencies"]["Hello"];
    assert_eq!(hello["source"]["network"], "testnet");
    assert_eq!(hello["source"]["address"], HELLO_ADDRESS);
    assert_eq!(hello["source"]["contract"], "Hello");
    assert_eq!(hello["aliases"]["testnet"], HELLO_ADDRESS);
    // dependency contract records are derived, not written
    assert!(json.get("contracts").is_none());
}

#[tokio::test]
async fn test_transitive_install_is_depth_first() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet")
            .with_contract(address("0x01"), "Foo", FOO)
            .with_contract(address("0x02"), "Bar", BAR),
    );
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json")
        .with_options(quiet());
    installer
        .add_by_source_string("testnet://0000000000000001.Foo")
        .await
        .unwrap();

    let actions = &installer.logs().file_system_actions;
    assert_eq!(actions.len(), 2);
    assert!(actions[0].contains("Foo"));
    assert!(actions[1].contains("Bar"));
    assert_eq!(installer.graph().imports_of("Foo"), vec!["Bar"]);
    assert_eq!(installer.graph().names(), vec!["Foo", "Bar"]);
    assert!(!installer.graph().has_cycle());

    // the file holds name imports, the hash covers what the chain returned
    let foo = read(&fs, "imports/0000000000000001/Foo.cdc");
    assert!(foo.starts_with("import \"Bar\"\n"));
    assert!(!foo.contains("0x0000000000000002"));
    assert_eq!(read(&fs, "imports/0000000000000002/Bar.cdc"), BAR);

    let manifest = saved_manifest(&fs);
    let names: Vec<&str> = manifest.dependencies.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Foo", "Bar"]);
    assert_eq!(
        manifest.dependency("Foo").unwrap().hash,
        Checksum::from_bytes(FOO.as_bytes())
    );
    assert_eq!(
        manifest.dependency("Bar").unwrap().source.to_string(),
        "testnet://0000000000000002.Bar"
    );
}

#[tokio::test]
async fn test_self_import_installs_once() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(MemoryGateway::for_network("testnet").with_contract(address("0x03"), "Loop", LOOP));
    let gateways = testnet(&gateway);

    add(&fs, &gateways, "testnet://03.Loop").await.unwrap();

    let files: Vec<_> = fs
        .paths()
        .into_iter()
        .filter(|path| path.starts_with("imports"))
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(saved_manifest(&fs).dependencies.len(), 1);
    assert_eq!(gateway.requests(), vec![address("0x03")]);
}

#[tokio::test]
async fn test_mutual_imports_are_recorded_as_a_cycle() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet")
            .with_contract(address("0x05"), "Ping", "import Pong from 0x06\naccess(all) contract Ping {}\n")
            .with_contract(address("0x06"), "Pong", "import Ping from 0x05\naccess(all) contract Pong {}\n"),
    );
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json")
        .with_options(quiet());
    installer.add_by_source_string("testnet://05.Ping").await.unwrap();

    assert_eq!(installer.graph().imports_of("Ping"), vec!["Pong"]);
    assert_eq!(installer.graph().imports_of("Pong"), vec!["Ping"]);
    assert!(installer.graph().has_cycle());
    assert_eq!(installer.logs().file_system_actions.len(), 2);
    assert_eq!(gateway.requests(), vec![address("0x05"), address("0x06")]);
}

#[tokio::test]
async fn test_string_imports_are_not_followed() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(MemoryGateway::for_network("testnet").with_contract(address("0x04"), "Named", NAMED));
    let gateways = testnet(&gateway);

    add(&fs, &gateways, "testnet://04.Named").await.unwrap();

    assert_eq!(gateway.requests(), vec![address("0x04")]);
    assert_eq!(read(&fs, "imports/0000000000000004/Named.cdc"), NAMED);
    assert_eq!(saved_manifest(&fs).dependencies.len(), 1);
}

#[tokio::test]
async fn test_existing_file_is_not_overwritten() {
    let edited = "// local edits\naccess(all) contract Hello {}\n";
    let fs = MemoryFs::new().with_file("imports/8efde57e98c557fa/Hello.cdc", edited);
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );

    add(&fs, &testnet(&gateway), "testnet://8efde57e98c557fa.Hello")
        .await
        .unwrap();

    assert_eq!(read(&fs, "imports/8efde57e98c557fa/Hello.cdc"), edited);
    assert_eq!(
        saved_manifest(&fs).dependency("Hello").unwrap().hash,
        Checksum::from_bytes(HELLO.as_bytes())
    );
}

// =============================================================================
// Re-installing
// =============================================================================

#[tokio::test]
async fn test_reinstall_is_idempotent() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet")
            .with_contract(address("0x01"), "Foo", FOO)
            .with_contract(address("0x02"), "Bar", BAR),
    );
    let gateways = testnet(&gateway);
    add(&fs, &gateways, "testnet://01.Foo").await.unwrap();
    let before = read(&fs, "flow.json");

    let prompter = ScriptedPrompter::new([]);
    let mut installer = Installer::load(&fs, &gateways, &prompter, "flow.json").unwrap();
    installer.install().await.unwrap();

    assert!(installer.logs().is_empty(), "{}", installer.logs());
    assert!(prompter.questions().is_empty());
    assert_eq!(read(&fs, "flow.json"), before);

    // adding the same source again does nothing either
    installer
        .add_by_source_string("testnet://0000000000000001.Foo")
        .await
        .unwrap();
    assert!(installer.logs().is_empty());
    assert_eq!(read(&fs, "flow.json"), before);
}

#[tokio::test]
async fn test_hand_written_manifest_is_preserved_byte_for_byte() {
    let manifest = format!(
        "{{\"dependencies\":{{\"Hello\":{{\"source\":\"testnet://{}.Hello\",\"hash\":\"{}\",\"aliases\":{{\"testnet\":\"{}\"}}}}}}}}",
        HELLO_ADDRESS,
        Checksum::from_bytes(HELLO.as_bytes()),
        HELLO_ADDRESS
    );
    let fs = MemoryFs::new()
        .with_file("flow.json", &manifest)
        .with_file("imports/8efde57e98c557fa/Hello.cdc", HELLO);
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer = Installer::load(&fs, &gateways, &prompter, "flow.json").unwrap();
    installer.install().await.unwrap();

    assert!(installer.logs().is_empty());
    assert_eq!(read(&fs, "flow.json"), manifest);
}

#[tokio::test]
async fn test_changed_code_is_updated_when_confirmed() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    add(&fs, &gateways, "testnet://8efde57e98c557fa.Hello").await.unwrap();

    let updated = HELLO.replace("Hello, World!", "Hello, Flow!");
    gateway.set_contract(address(HELLO_ADDRESS), "Hello", &updated);

    let prompter = ScriptedPrompter::new([Answer::Yes]);
    let mut installer = Installer::load(&fs, &gateways, &prompter, "flow.json").unwrap();
    installer.install().await.unwrap();

    let questions = prompter.questions();
    assert_eq!(questions.len(), 1);
    assert!(questions[0].contains("-        self.greeting = \"Hello, World!\""));
    assert!(questions[0].contains("+        self.greeting = \"Hello, Flow!\""));
    assert_eq!(read(&fs, "imports/8efde57e98c557fa/Hello.cdc"), updated);
    assert_eq!(
        saved_manifest(&fs).dependency("Hello").unwrap().hash,
        Checksum::from_bytes(updated.as_bytes())
    );
    assert_eq!(installer.logs().state_updates, vec!["Hello updated in flow.json"]);
}

#[tokio::test]
async fn test_changed_code_is_kept_when_declined() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    add(&fs, &gateways, "testnet://8efde57e98c557fa.Hello").await.unwrap();
    let before = read(&fs, "flow.json");

    gateway.set_contract(address(HELLO_ADDRESS), "Hello", "access(all) contract Hello {}");

    let prompter = ScriptedPrompter::new([Answer::No]);
    let mut installer = Installer::load(&fs, &gateways, &prompter, "flow.json").unwrap();
    installer.install().await.unwrap();

    assert_eq!(read(&fs, "imports/8efde57e98c557fa/Hello.cdc"), HELLO);
    assert_eq!(read(&fs, "flow.json"), before);
    assert!(installer.logs().is_empty());
}

// =============================================================================
// Conflicts and failures
// =============================================================================

#[tokio::test]
async fn test_remote_source_conflict_aborts() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet")
            .with_contract(address("0x01"), "Hello", HELLO)
            .with_contract(address("0x02"), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    add(&fs, &gateways, "testnet://01.Hello").await.unwrap();
    let before = read(&fs, "flow.json");

    let error = add(&fs, &gateways, "testnet://02.Hello").await.unwrap_err();
    match error {
        FlowError::RemoteSourceConflict {
            name,
            existing,
            incoming,
        } => {
            assert_eq!(name, "Hello");
            assert_eq!(existing, "testnet://0000000000000001.Hello");
            assert_eq!(incoming, "testnet://0000000000000002.Hello");
        }
        other => panic!("expected a remote source conflict, got {:?}", other),
    }
    assert_eq!(read(&fs, "flow.json"), before);
    assert!(!fs.exists(Path::new("imports/0000000000000002/Hello.cdc")));
}

#[tokio::test]
async fn test_failure_saves_nothing_but_keeps_the_summary() {
    let fs = MemoryFs::new();
    // Bar's account is missing
    let gateway = Arc::new(MemoryGateway::for_network("testnet").with_contract(address("0x01"), "Foo", FOO));
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json")
        .with_options(quiet());
    let error = installer
        .add_by_source_string("testnet://01.Foo")
        .await
        .unwrap_err();

    assert!(matches!(error, FlowError::AccountMissing { .. }));
    assert!(!fs.exists(Path::new("flow.json")));
    assert_eq!(installer.logs().file_system_actions.len(), 1);
    assert!(installer.logs().to_string().contains("Foo"));
}

#[tokio::test]
async fn test_project_contract_with_same_name_is_an_issue() {
    let manifest = r#"{"contracts": {"Hello": "cadence/contracts/Hello.cdc"}}"#;
    let fs = MemoryFs::new().with_file("flow.json", manifest);
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );

    add(&fs, &testnet(&gateway), "testnet://8efde57e98c557fa.Hello")
        .await
        .unwrap();

    let saved = saved_manifest(&fs);
    let contract = saved.contract("Hello").unwrap();
    assert!(!contract.is_dependency);
    assert_eq!(
        contract.location.as_deref(),
        Some(Path::new("cadence/contracts/Hello.cdc"))
    );
    assert!(saved.dependency("Hello").is_some());
}

#[tokio::test]
async fn test_issue_is_logged_for_project_contract() {
    let manifest = Manifest::from_json(r#"{"contracts": {"Hello": "cadence/contracts/Hello.cdc"}}"#).unwrap();
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("testnet").with_contract(address(HELLO_ADDRESS), "Hello", HELLO),
    );
    let gateways = testnet(&gateway);
    let prompter = ScriptedPrompter::new([]);

    let mut installer =
        Installer::new(&fs, &gateways, &prompter, manifest, "flow.json").with_options(quiet());
    installer
        .add_by_source_string("testnet://8efde57e98c557fa.Hello")
        .await
        .unwrap();

    assert_eq!(installer.logs().issues.len(), 1);
    assert!(installer.logs().issues[0].contains("Hello"));
}

#[tokio::test]
async fn test_invalid_source_string() {
    let fs = MemoryFs::new();
    let gateways = Gateways::new();
    let error = add(&fs, &gateways, "testnet:/01.Hello").await.unwrap_err();
    assert!(matches!(error, FlowError::InvalidSource(_)));
}

// =============================================================================
// Core contracts
// =============================================================================

#[tokio::test]
async fn test_discover_installs_picked_core_contracts() {
    let fs = MemoryFs::new();
    let gateway = Arc::new(
        MemoryGateway::for_network("mainnet")
            .with_contract(address("f233dcee88fe0abe"), "FungibleToken", "access(all) contract interface FungibleToken {}")
            .with_contract(address("f233dcee88fe0abe"), "Burner", "access(all) contract Burner {}"),
    );
    let gateways = Gateways::new().with("mainnet", gateway.clone());
    // FungibleToken is first in the list, Burner ninth
    let prompter = ScriptedPrompter::new([Answer::Many(vec![0, 8])]);

    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
    installer.discover().await.unwrap();

    let manifest = saved_manifest(&fs);
    let names: Vec<&str> = manifest.dependencies.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["FungibleToken", "Burner"]);
    let burner = manifest.dependency("Burner").unwrap();
    assert_eq!(burner.aliases["emulator"], address("f8d6e0586b0a20c7"));
    assert_eq!(prompter.questions().len(), 1);
}

#[tokio::test]
async fn test_unknown_core_contract_name() {
    let fs = MemoryFs::new();
    let gateways = Gateways::new();
    let prompter = ScriptedPrompter::new([]);
    let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");

    let error = installer
        .add_by_core_contract_name("FungibleTokn")
        .await
        .unwrap_err();
    match error {
        FlowError::UnknownCoreContract { name, suggestions } => {
            assert_eq!(name, "FungibleTokn");
            assert!(suggestions.iter().any(|s| s == "FungibleToken"));
        }
        other => panic!("expected an unknown core contract, got {:?}", other),
    }
}
