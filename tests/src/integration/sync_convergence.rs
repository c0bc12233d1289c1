//! # Sync Convergence
//!
//! A peer that joins late and a peer that restarts after missing blocks
//! both end up with the orderer's chain, byte for byte.

#[cfg(test)]
mod tests {
    use crate::fixtures::{broadcast, eventually, transaction, Network, RPC_DEADLINE};
    use node_runtime::adapters::client;
    use node_runtime::{OrdererNode, PeerNode};
    use pc_02_block_storage::BlockStore;
    use pc_04_block_sync::BlockSyncApi;
    use shared_types::rpc::{OrdererRequest, OrdererResponse};
    use shared_types::{marshal, Block, StatusCode};

    const CHANNEL: &str = "ledger";

    fn chain(store: &dyn BlockStore) -> Vec<Vec<u8>> {
        let height = store.height(CHANNEL).unwrap();
        store
            .get_block_range(CHANNEL, 0, height)
            .unwrap()
            .iter()
            .map(|b| marshal(b).unwrap())
            .collect()
    }

    async fn genesis(orderer: &OrdererNode) -> Block {
        let response: OrdererResponse = client::call(
            &orderer.local_addr().to_string(),
            &OrdererRequest::BlockRange {
                channel_id: CHANNEL.into(),
                start: 0,
                end: 1,
            },
            RPC_DEADLINE,
        )
        .await
        .unwrap();
        match response {
            OrdererResponse::Blocks {
                status: StatusCode::Ok,
                mut blocks,
                ..
            } if blocks.len() == 1 => blocks.remove(0),
            other => panic!("unexpected response {:?}", other),
        }
    }

    async fn send_transactions(net: &Network, orderer: &OrdererNode, range: std::ops::Range<u32>) {
        let signer = net.org1.signing_identity("client");
        for i in range {
            let body = format!("tx-{}", i);
            let status = broadcast(orderer, transaction(&signer, CHANNEL, body.as_bytes())).await;
            assert_eq!(status, StatusCode::Ok);
        }
    }

    fn height(peer: &PeerNode) -> Option<u64> {
        peer.service().synchronizer().channel_height(CHANNEL)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_late_and_restarted_peers_converge() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let founder = net.start_peer(&net.org1, "peer0-org1", &orderer).await;
        founder
            .service()
            .create_channel(&net.channel(CHANNEL, &[&net.org1, &net.org2]))
            .await
            .unwrap();

        send_transactions(&net, &orderer, 0..7).await;
        assert_eq!(orderer.store().height(CHANNEL).unwrap(), 8);
        eventually(|| height(&founder) == Some(8)).await;

        // Late joiner: genesis from the orderer, then one catch-up pass in
        // batches of three.
        let late = net.start_peer(&net.org2, "peer0-org2", &orderer).await;
        let sync = late.service().synchronizer();
        assert_eq!(sync.join_channel(&genesis(&orderer).await).await.unwrap(), CHANNEL);
        let report = sync.sync_channel(CHANNEL).await.unwrap();
        assert_eq!(report.from_height, 1);
        assert_eq!(report.to_height, 8);

        let expected = chain(orderer.store().as_ref());
        assert_eq!(chain(founder.service().store().as_ref()), expected);
        assert_eq!(chain(late.service().store().as_ref()), expected);

        // Restart while the orderer keeps cutting blocks.
        late.shutdown().await;
        send_transactions(&net, &orderer, 7..9).await;
        let late = net.start_peer(&net.org2, "peer0-org2", &orderer).await;
        assert_eq!(late.service().synchronizer().channels(), vec![CHANNEL]);
        assert_eq!(height(&late), Some(10));

        eventually(|| height(&founder) == Some(10)).await;
        let expected = chain(orderer.store().as_ref());
        assert_eq!(expected.len(), 10);
        assert_eq!(chain(late.service().store().as_ref()), expected);
        assert_eq!(chain(founder.service().store().as_ref()), expected);

        late.shutdown().await;
        founder.shutdown().await;
        orderer.shutdown().await;
    }
}
