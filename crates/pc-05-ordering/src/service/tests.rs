//! # Ordering Service Tests

use super::*;
use pc_01_msp::test_utils::OrgFixture;
use pc_01_msp::{Identity, MspService, SigningIdentity};
use pc_02_block_storage::{Fault, FaultyFileSystem, FileBlockStore, StorageDependencies};
use pc_03_channel_creation::{
    ChannelCreationApi, ChannelCreationDependencies, ChannelCreationService, ChannelProposal,
    ConsortiumConfig,
};
use shared_types::config::WRITERS_POLICY;
use shared_types::{
    calculate_block_hash, create_header, create_payload, seal_envelope, unmarshal,
    ApplicationConfig, BatchParameters, OrdererSection, PolicyRule, Principal, StatusCode,
};
use tempfile::TempDir;

struct Harness {
    ordering: Arc<OrderingService>,
    creation: ChannelCreationService,
    store: Arc<FileBlockStore>,
    org1: OrgFixture,
    org2: OrgFixture,
    outsider: OrgFixture,
    _dir: TempDir,
}

fn batch(count: u32, timeout_ms: u64) -> BatchParameters {
    BatchParameters {
        max_message_count: count,
        batch_timeout_ms: timeout_ms,
        absolute_max_bytes: 1 << 20,
    }
}

impl Harness {
    fn new(params: BatchParameters) -> Self {
        Self::with_deps(params, StorageDependencies::default())
    }

    fn with_deps(params: BatchParameters, storage: StorageDependencies) -> Self {
        let dir = TempDir::new().unwrap();
        let orderer = OrgFixture::new("OrdererMSP");
        let org1 = OrgFixture::new("Org1MSP");
        let org2 = OrgFixture::new("Org2MSP");
        let outsider = OrgFixture::new("OutsiderMSP");

        let store = Arc::new(FileBlockStore::open_with(dir.path(), storage).unwrap());
        let bus = Arc::new(InMemoryBlockBus::new());
        let table = Arc::new(ChannelTable::new());
        let orderer_msp = orderer.msp("orderer0");
        let section = OrdererSection {
            msp_id: "OrdererMSP".into(),
            root_certs: orderer_msp.root_certs_pem(),
            endpoints: Vec::new(),
            batch: BatchParameters::default(),
        };
        let msp: Arc<dyn MembershipService> = Arc::new(MspService::new(orderer_msp));

        let creation = ChannelCreationService::new(
            ChannelCreationDependencies {
                msp: msp.clone(),
                store: store.clone(),
                publisher: bus.clone(),
                table: table.clone(),
            },
            ConsortiumConfig::new(
                "SampleConsortium",
                vec![org1.organization_config(), org2.organization_config()],
            ),
            section,
        )
        .unwrap();
        let ordering = OrderingService::new(OrderingDependencies {
            msp,
            store: store.clone(),
            bus,
            table,
        });

        let h = Self {
            ordering: Arc::new(ordering),
            creation,
            store,
            org1,
            org2,
            outsider,
            _dir: dir,
        };
        let mut config = ApplicationConfig::new(
            "c1",
            "SampleConsortium",
            vec![h.org1.organization_config(), h.org2.organization_config()],
        );
        config.batch = Some(params);
        h.create(config);
        h
    }

    fn create(&self, config: ApplicationConfig) -> Block {
        let signer = self.org1.signing_identity("admin");
        let envelope = ChannelProposal::build(&signer, &config).unwrap();
        self.creation.handle_proposal(&envelope).unwrap()
    }
}

fn tx(signer: &SigningIdentity, message_type: MessageType, channel: &str) -> Envelope {
    let header = create_header(signer.serialize(), message_type, channel);
    seal_envelope(signer, &create_payload(header, b"invoke".to_vec())).unwrap()
}

fn status(result: Result<Vec<Block>, OrderingError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::Ok,
        Err(e) => e.status_code(),
    }
}

#[test]
fn test_blocks_cut_at_message_count() {
    let h = Harness::new(batch(2, 60_000));
    let signer = h.org1.signing_identity("client");
    let genesis = h.store.get_block("c1", 0).unwrap();

    let first = tx(&signer, MessageType::EndorserTransaction, "c1");
    assert!(h.ordering.broadcast(&first).unwrap().is_empty());
    let second = tx(&h.org2.signing_identity("client"), MessageType::EndorserTransaction, "c1");
    let blocks = h.ordering.broadcast(&second).unwrap();

    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.number(), 1);
    assert_eq!(block.header.block_type, BlockType::Normal);
    assert_eq!(block.header.previous_hash, genesis.header.hash);
    assert_eq!(block.header.hash, calculate_block_hash(block).to_vec());
    assert!(block.metadata.validation_bitmap.is_valid(1));

    let included: Envelope = unmarshal(&block.data.transactions[0]).unwrap();
    assert_eq!(included, first);

    let orderer = Identity::from_serialized(&shared_types::SerializedIdentity::new(
        "OrdererMSP",
        block.metadata.creator_cert.clone(),
    ))
    .unwrap();
    orderer
        .verify(&block.header.hash, &block.metadata.creator_signature)
        .unwrap();

    assert_eq!(h.ordering.channel_height("c1").unwrap(), 2);
    assert!(h.store.is_committed("c1", 1).unwrap());
}

#[test]
fn test_broadcast_rejections() {
    let h = Harness::new(batch(1, 60_000));
    let member = h.org1.signing_identity("client");

    let config_msg = tx(&member, MessageType::Config, "c1");
    assert_eq!(status(h.ordering.broadcast(&config_msg)), StatusCode::InvalidMessageType);

    let unknown = tx(&member, MessageType::EndorserTransaction, "nochannel");
    assert_eq!(status(h.ordering.broadcast(&unknown)), StatusCode::ChannelNotFound);

    let outsider = tx(
        &h.outsider.signing_identity("client"),
        MessageType::EndorserTransaction,
        "c1",
    );
    assert_eq!(status(h.ordering.broadcast(&outsider)), StatusCode::Forbidden);

    let mut forged = tx(&member, MessageType::EndorserTransaction, "c1");
    let last = forged.signature.len() - 1;
    forged.signature[last] ^= 0x01;
    assert_eq!(status(h.ordering.broadcast(&forged)), StatusCode::InvalidSignature);

    let garbage = Envelope {
        payload: vec![0xde, 0xad],
        signature: vec![1],
    };
    assert_eq!(
        status(h.ordering.broadcast(&garbage)),
        StatusCode::InvalidTransactionFormat
    );

    assert_eq!(h.ordering.channel_height("c1").unwrap(), 1);
}

#[test]
fn test_writers_policy_enforced() {
    let h = Harness::new(batch(1, 60_000));
    let mut config = ApplicationConfig::new(
        "admins-only",
        "SampleConsortium",
        vec![h.org1.organization_config()],
    );
    config.policies.insert(
        WRITERS_POLICY.to_string(),
        PolicyRule::Signature {
            identities: vec![Principal::admin("Org1MSP")],
            n_out_of: 1,
        },
    );
    h.create(config);

    let member = tx(
        &h.org1.signing_identity("client"),
        MessageType::EndorserTransaction,
        "admins-only",
    );
    assert_eq!(status(h.ordering.broadcast(&member)), StatusCode::Forbidden);

    // Org2 is in the consortium but not in this channel.
    let stranger = tx(
        &h.org2.signing_identity("client"),
        MessageType::EndorserTransaction,
        "admins-only",
    );
    assert_eq!(status(h.ordering.broadcast(&stranger)), StatusCode::Forbidden);
}

#[test]
fn test_batch_timeout_cuts_pending() {
    let h = Harness::new(batch(100, 10_000));
    let signer = h.org1.signing_identity("client");
    for _ in 0..3 {
        let envelope = tx(&signer, MessageType::EndorserTransaction, "c1");
        assert!(h.ordering.broadcast(&envelope).unwrap().is_empty());
    }

    assert!(h.ordering.cut_expired(Instant::now()).is_empty());
    let blocks = h
        .ordering
        .cut_expired(Instant::now() + Duration::from_secs(20));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].transaction_count(), 3);
    assert!(h
        .ordering
        .cut_expired(Instant::now() + Duration::from_secs(40))
        .is_empty());
}

#[test]
fn test_height_and_range_serving() {
    let h = Harness::new(batch(1, 60_000));
    let signer = h.org1.signing_identity("client");
    for _ in 0..4 {
        h.ordering
            .broadcast(&tx(&signer, MessageType::EndorserTransaction, "c1"))
            .unwrap();
    }

    assert_eq!(h.ordering.channel_height("c1").unwrap(), 5);
    let all = h.ordering.block_range("c1", 0, 100).unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().enumerate().all(|(i, b)| b.number() == i as u64));
    assert_eq!(h.ordering.block_range("c1", 2, 4).unwrap().len(), 2);
    assert!(h.ordering.block_range("c1", 9, 12).unwrap().is_empty());
    assert!(matches!(
        h.ordering.block_range("c1", 4, 2),
        Err(OrderingError::InvalidRange { .. })
    ));
    assert!(matches!(
        h.ordering.channel_height("missing"),
        Err(OrderingError::ChannelNotFound(_))
    ));
    assert_eq!(h.ordering.list_channels(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn test_deliver_replays_then_follows() {
    let h = Harness::new(batch(1, 60_000));
    let signer = h.org1.signing_identity("client");
    h.ordering
        .broadcast(&tx(&signer, MessageType::EndorserTransaction, "c1"))
        .unwrap();

    let mut cursor = h.ordering.deliver("c1", 0).unwrap();
    assert_eq!(cursor.next_block().await.unwrap().number(), 0);
    assert_eq!(cursor.next_block().await.unwrap().number(), 1);
    assert_eq!(cursor.position(), 2);

    let ordering = h.ordering.clone();
    let envelope = tx(&signer, MessageType::EndorserTransaction, "c1");
    let producer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ordering.broadcast(&envelope).unwrap();
    });

    let live = tokio::time::timeout(Duration::from_secs(5), cursor.next_block())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.number(), 2);
    assert_eq!(live, h.store.get_block("c1", 2).unwrap());
    producer.await.unwrap();

    assert!(matches!(
        h.ordering.deliver("missing", 0),
        Err(OrderingError::ChannelNotFound(_))
    ));
}

#[tokio::test]
async fn test_batch_timer_worker() {
    let h = Harness::new(batch(100, 50));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = h.ordering.spawn_batch_timer(shutdown_rx);

    let signer = h.org1.signing_identity("client");
    h.ordering
        .broadcast(&tx(&signer, MessageType::EndorserTransaction, "c1"))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while h.ordering.channel_height("c1").unwrap() < 2 {
        assert!(Instant::now() < deadline, "timer never cut the batch");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
}

fn faulty_harness(params: BatchParameters) -> (Harness, Arc<FaultyFileSystem>) {
    let fs = Arc::new(FaultyFileSystem::new(Fault::None));
    let h = Harness::with_deps(
        params,
        StorageDependencies {
            fs: fs.clone(),
            ..StorageDependencies::default()
        },
    );
    (h, fs)
}

fn included(block: &Block) -> Vec<Envelope> {
    block
        .data
        .transactions
        .iter()
        .map(|tx| unmarshal(tx).unwrap())
        .collect()
}

#[test]
fn test_failed_block_write_keeps_batch() {
    let (h, fs) = faulty_harness(batch(2, 60_000));
    let signer = h.org1.signing_identity("client");
    let first = tx(&signer, MessageType::EndorserTransaction, "c1");
    let second = tx(&signer, MessageType::EndorserTransaction, "c1");
    let third = tx(&signer, MessageType::EndorserTransaction, "c1");

    assert!(h.ordering.broadcast(&first).unwrap().is_empty());
    fs.set_fault(Fault::FailRename);
    // Accepted even though the block could not be written.
    assert!(h.ordering.broadcast(&second).unwrap().is_empty());
    assert_eq!(h.ordering.channel_height("c1").unwrap(), 1);

    fs.set_fault(Fault::None);
    let blocks = h.ordering.broadcast(&third).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].number(), 1);
    assert_eq!(included(&blocks[0]), vec![first, second]);

    let late = h
        .ordering
        .cut_expired(Instant::now() + Duration::from_secs(120));
    assert_eq!(late.len(), 1);
    assert_eq!(included(&late[0]), vec![third]);
    assert_eq!(h.ordering.channel_height("c1").unwrap(), 3);
}

#[test]
fn test_batch_timer_retries_stalled_batch() {
    let (h, fs) = faulty_harness(batch(1, 60_000));
    let signer = h.org1.signing_identity("client");
    let envelope = tx(&signer, MessageType::EndorserTransaction, "c1");

    fs.set_fault(Fault::FailRename);
    assert!(h.ordering.broadcast(&envelope).unwrap().is_empty());
    assert!(h.ordering.cut_expired(Instant::now()).is_empty());

    fs.set_fault(Fault::None);
    // Nothing has timed out, but the stalled batch is written.
    let blocks = h.ordering.cut_expired(Instant::now());
    assert_eq!(blocks.len(), 1);
    assert_eq!(included(&blocks[0]), vec![envelope]);
    assert!(h.ordering.cut_expired(Instant::now()).is_empty());
}

#[test]
fn test_commit_mark_failure_does_not_rewrite_block() {
    let (h, fs) = faulty_harness(batch(1, 60_000));
    let signer = h.org1.signing_identity("client");

    fs.set_fault(Fault::FailOverwrite);
    let first = h
        .ordering
        .broadcast(&tx(&signer, MessageType::EndorserTransaction, "c1"))
        .unwrap();
    assert_eq!(first.len(), 1);
    assert!(!h.store.is_committed("c1", 1).unwrap());

    let second = h
        .ordering
        .broadcast(&tx(&signer, MessageType::EndorserTransaction, "c1"))
        .unwrap();
    assert_eq!(second[0].number(), 2);
    assert_eq!(h.ordering.channel_height("c1").unwrap(), 3);

    fs.set_fault(Fault::None);
    ChannelTable::rebuild(h.store.as_ref()).unwrap();
    assert!((0..3).all(|n| h.store.is_committed("c1", n).unwrap()));
}
