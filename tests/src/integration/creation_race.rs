//! # Channel Creation Race
//!
//! Many creation streams propose the same channel name at once. Exactly
//! one proposal commits; every other one is answered `ALREADY_EXISTS`.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Network, RPC_DEADLINE};
    use node_runtime::adapters::client::submit_channel_proposal;
    use pc_02_block_storage::BlockStore;
    use pc_03_channel_creation::{ChannelCreationApi, ChannelProposal};
    use shared_types::StatusCode;

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_exactly_one_creator_wins() {
        let net = Network::new();
        let orderer = net.start_orderer().await;
        let addr = orderer.local_addr().to_string();
        let config = net.channel("race", &[&net.org1, &net.org2]);

        let envelopes: Vec<_> = (0..8)
            .map(|i| {
                let org = if i % 2 == 0 { &net.org1 } else { &net.org2 };
                let signer = org.signing_identity(&format!("admin{}", i));
                ChannelProposal::build(&signer, &config).unwrap()
            })
            .collect();

        let attempts = envelopes.into_iter().map(|envelope| {
            let addr = addr.clone();
            tokio::spawn(async move {
                submit_channel_proposal(&addr, &envelope, RPC_DEADLINE)
                    .await
                    .unwrap()
            })
        });
        let responses = futures::future::join_all(attempts).await;

        let statuses: Vec<StatusCode> = responses.into_iter().map(|r| r.unwrap().status).collect();
        assert_eq!(statuses.iter().filter(|s| s.is_ok()).count(), 1);
        assert_eq!(
            statuses
                .iter()
                .filter(|s| **s == StatusCode::AlreadyExists)
                .count(),
            7
        );
        assert_eq!(orderer.store().height("race").unwrap(), 1);
        assert_eq!(orderer.handler().creation().list_channels(), vec!["race"]);

        orderer.shutdown().await;
    }
}
