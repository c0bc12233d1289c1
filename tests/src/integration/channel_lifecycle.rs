//! # Channel Lifecycle
//!
//! Operator asks a peer to create a channel, the orderer commits block 0,
//! the peer joins it and follows every block cut afterwards.

#[cfg(test)]
mod tests {
    use crate::fixtures::{broadcast, eventually, transaction, Network, RPC_DEADLINE};
    use node_runtime::adapters::client;
    use pc_02_block_storage::BlockStore;
    use pc_03_channel_creation::config_from_block;
    use pc_04_block_sync::BlockSyncApi;
    use shared_types::rpc::{PeerRequest, PeerResponse};
    use shared_types::{marshal, StatusCode};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_create_join_and_follow() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let peer = net.start_peer(&net.org1, "peer0-org1", &orderer).await;
        let sync = peer.service().synchronizer();

        let block = peer
            .service()
            .create_channel(&net.channel("mychannel", &[&net.org1]))
            .await
            .unwrap();
        assert_eq!(block.number(), 0);
        assert!(block.is_config());
        let config = config_from_block(&block).unwrap();
        assert_eq!(config.channel_id, "mychannel");
        assert_eq!(config.orderer.msp_id, "OrdererMSP");
        assert_eq!(config.application.organizations[0].msp_id, "Org1MSP");

        assert_eq!(sync.channel_height("mychannel"), Some(1));
        assert_eq!(orderer.store().height("mychannel").unwrap(), 1);
        assert!(peer.service().store().is_committed("mychannel", 0).unwrap());

        let peer_addr = peer.local_addr().to_string();
        let height: PeerResponse = client::call(
            &peer_addr,
            &PeerRequest::ChannelHeight {
                channel_id: "mychannel".into(),
            },
            RPC_DEADLINE,
        )
        .await
        .unwrap();
        assert_eq!(
            height,
            PeerResponse::Height {
                status: StatusCode::Ok,
                height: 1
            }
        );
        let channels: PeerResponse = client::call(&peer_addr, &PeerRequest::ListChannels, RPC_DEADLINE)
            .await
            .unwrap();
        assert_eq!(
            channels,
            PeerResponse::Channels {
                channels: vec!["mychannel".into()]
            }
        );

        let client_identity = net.org1.signing_identity("client");
        let status = broadcast(&orderer, transaction(&client_identity, "mychannel", b"tx-1")).await;
        assert_eq!(status, StatusCode::Ok);
        eventually(|| sync.channel_height("mychannel") == Some(2)).await;

        let ours = peer.service().store().get_block("mychannel", 1).unwrap();
        let theirs = orderer.store().get_block("mychannel", 1).unwrap();
        assert_eq!(marshal(&ours).unwrap(), marshal(&theirs).unwrap());

        peer.shutdown().await;
        orderer.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_channel_is_already_exists() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let peer = net.start_peer(&net.org1, "peer0-org1", &orderer).await;
        let config = net.channel("mychannel", &[&net.org1]);

        peer.service().create_channel(&config).await.unwrap();
        let err = peer.service().create_channel(&config).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AlreadyExists);
        assert_eq!(err.status_code().as_u16(), 3);
        assert_eq!(orderer.store().height("mychannel").unwrap(), 1);

        peer.shutdown().await;
        orderer.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_create_over_admin_rpc() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let peer = net.start_peer(&net.org2, "peer0-org2", &orderer).await;

        let response: PeerResponse = client::call(
            &peer.local_addr().to_string(),
            &PeerRequest::CreateChannel(net.channel("shared", &[&net.org1, &net.org2])),
            RPC_DEADLINE,
        )
        .await
        .unwrap();
        match response {
            PeerResponse::ChannelCreated {
                status: StatusCode::Ok,
                block: Some(block),
                ..
            } => assert_eq!(block.number(), 0),
            other => panic!("unexpected response {:?}", other),
        }
        assert_eq!(peer.service().synchronizer().channels(), vec!["shared"]);

        peer.shutdown().await;
        orderer.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rejections() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let peer = net.start_peer(&net.org1, "peer0-org1", &orderer).await;

        // Not a consortium member.
        let outsider = pc_01_msp::test_utils::OrgFixture::new("Org3MSP");
        let rogue = net.start_peer(&outsider, "peer0-org3", &orderer).await;
        let err = rogue
            .service()
            .create_channel(&net.channel("rogue", &[&outsider]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Forbidden);
        assert!(!orderer.store().has_channel("rogue"));

        // Rejected locally before anything is sent.
        let err = peer
            .service()
            .create_channel(&net.channel("Bad_Name", &[&net.org1]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgument);

        peer.service()
            .create_channel(&net.channel("mychannel", &[&net.org1]))
            .await
            .unwrap();
        let org1_client = net.org1.signing_identity("client");
        let org2_client = net.org2.signing_identity("client");
        assert_eq!(
            broadcast(&orderer, transaction(&org1_client, "nochannel", b"tx")).await,
            StatusCode::ChannelNotFound
        );
        assert_eq!(
            broadcast(&orderer, transaction(&org2_client, "mychannel", b"tx")).await,
            StatusCode::Forbidden
        );
        assert_eq!(orderer.store().height("mychannel").unwrap(), 1);

        rogue.shutdown().await;
        peer.shutdown().await;
        orderer.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unreachable_orderer_is_unavailable() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let mut config = net.peer_config(&net.org1, "peer0-org1", &orderer);
        orderer.shutdown().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        config.peer.orderer_addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let peer = node_runtime::PeerNode::start(&config).await.unwrap();
        let err = peer
            .service()
            .create_channel(&net.channel("mychannel", &[&net.org1]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Unavailable);
        peer.shutdown().await;
    }
}
