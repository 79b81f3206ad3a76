//! Integration tests for the crypto client over fake remotes

mod common;

use ::common::crypto::{
    combine_key_halves, make_random_server_half, make_random_tlf_keys, mask_key,
    wrap_client_half, CryptPrivateKey, EncryptionVersion, SigningKey, TlfCryptKeyClientHalf,
    TlfEphemeralPublicKey,
};
use ::common::rpc::{Ed25519SignatureInfo, Response};
use ::common::{Context, Crypto, CryptoClient, CryptoError, LocalCrypto};

use common::{
    bundle_for, device, init_tracing, CancelThenFail, FakeRemote, Rendezvous, ScriptedTransport,
};

#[tokio::test]
async fn test_remote_wrap_unwrap_round_trip() {
    init_tracing();
    let (engine, crypt_key) = device();
    let remote = FakeRemote::new(engine);
    let client = CryptoClient::new(remote.clone());

    let keys = make_random_tlf_keys().unwrap();
    let server_half = make_random_server_half().unwrap();
    let client_half = mask_key(&server_half, &keys.crypt_key);
    let encrypted =
        wrap_client_half(&keys.ephemeral_private, &crypt_key.public(), &client_half).unwrap();

    let recovered = client
        .unwrap_client_half(&Context::background(), &keys.ephemeral_public, &encrypted)
        .await
        .unwrap();
    assert_eq!(recovered, client_half);
    assert_eq!(combine_key_halves(&server_half, &recovered), keys.crypt_key);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_envelope_is_validated_before_the_call() {
    let (engine, crypt_key) = device();
    let remote = FakeRemote::new(engine);
    let client = CryptoClient::new(remote.clone());
    let ctx = Context::background();

    let half = TlfCryptKeyClientHalf::generate().unwrap();
    let bundle = bundle_for(&crypt_key, &half);

    let mut next_version = bundle.client_half.clone();
    next_version.version = EncryptionVersion(next_version.version.0 + 1);
    assert_eq!(
        client
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &next_version)
            .await,
        Err(CryptoError::UnknownEncryptionVersion(EncryptionVersion(2)))
    );

    let mut short_ciphertext = bundle.client_half.clone();
    short_ciphertext.encrypted_data.pop();
    assert_eq!(
        client
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &short_ciphertext)
            .await,
        Err(CryptoError::DecryptionFailed)
    );

    let mut short_nonce = bundle.client_half.clone();
    short_nonce.nonce.pop();
    assert_eq!(
        client
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &short_nonce)
            .await,
        Err(CryptoError::InvalidNonce(short_nonce.nonce.clone()))
    );

    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn test_single_bit_corruption_fails_decryption() {
    let (engine, crypt_key) = device();
    let client = CryptoClient::new(FakeRemote::new(engine));
    let ctx = Context::background();

    let half = TlfCryptKeyClientHalf::generate().unwrap();
    let bundle = bundle_for(&crypt_key, &half);

    let mut ephemeral = bundle.ephemeral_public.to_bytes();
    ephemeral[0] ^= 1;
    assert_eq!(
        client
            .unwrap_client_half(
                &ctx,
                &TlfEphemeralPublicKey::from(ephemeral),
                &bundle.client_half
            )
            .await,
        Err(CryptoError::DecryptionFailed)
    );

    let mut ciphertext = bundle.client_half.clone();
    ciphertext.encrypted_data[0] ^= 1;
    assert_eq!(
        client
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &ciphertext)
            .await,
        Err(CryptoError::DecryptionFailed)
    );

    // byte 1 sits outside the bits X25519 clamps
    let mut private = crypt_key.to_bytes();
    private[1] ^= 1;
    let flipped = CryptoClient::local(LocalCrypto::new(
        SigningKey::generate().unwrap(),
        CryptPrivateKey::from(private),
    ));
    assert_eq!(
        flipped
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &bundle.client_half)
            .await,
        Err(CryptoError::DecryptionFailed)
    );
}

#[tokio::test]
async fn test_any_with_no_bundles_makes_no_call() {
    let (engine, _) = device();
    let remote = FakeRemote::new(engine);
    let client = CryptoClient::new(remote.clone());

    assert_eq!(
        client
            .unwrap_client_half_any(&Context::background(), &[])
            .await,
        Err(CryptoError::NoCandidateKeys)
    );
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn test_any_returns_first_matching_bundle() {
    let (engine, crypt_key) = device();
    let client = CryptoClient::new(FakeRemote::new(engine));

    let half = TlfCryptKeyClientHalf::generate().unwrap();
    let mut bundles = vec![bundle_for(&crypt_key, &half)];
    for _ in 0..3 {
        let stranger = CryptPrivateKey::generate().unwrap();
        bundles.push(bundle_for(&stranger, &TlfCryptKeyClientHalf::generate().unwrap()));
    }

    let (recovered, index, kid) = client
        .unwrap_client_half_any(&Context::background(), &bundles)
        .await
        .unwrap();
    assert_eq!(recovered, half);
    assert_eq!(index, 0);
    assert_eq!(kid, crypt_key.public().kid());
}

#[tokio::test]
async fn test_any_with_no_local_key_reports_no_match() {
    let (engine, _) = device();
    let client = CryptoClient::new(FakeRemote::new(engine));

    let stranger = CryptPrivateKey::generate().unwrap();
    let bundles = vec![bundle_for(&stranger, &TlfCryptKeyClientHalf::generate().unwrap())];
    assert_eq!(
        client
            .unwrap_client_half_any(&Context::background(), &bundles)
            .await,
        Err(CryptoError::NoMatchingKey)
    );
}

#[tokio::test]
async fn test_cancel_during_remote_sign() {
    init_tracing();
    let (engine, _) = device();
    let rendezvous = Rendezvous::new();
    let remote = FakeRemote::with_rendezvous(engine, rendezvous.clone());
    let client = CryptoClient::new(remote.clone());
    let (ctx, handle) = Context::with_cancel();

    let helper = tokio::spawn(async move {
        rendezvous.meet().await;
        handle.cancel();
        rendezvous.meet().await;
    });

    assert_eq!(
        client.sign(&ctx, b"never signed").await,
        Err(CryptoError::OperationCanceled)
    );
    helper.await.unwrap();
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_cancel_during_remote_unbox() {
    let (engine, crypt_key) = device();
    let rendezvous = Rendezvous::new();
    let client = CryptoClient::new(FakeRemote::with_rendezvous(engine, rendezvous.clone()));
    let (ctx, handle) = Context::with_cancel();

    let half = TlfCryptKeyClientHalf::generate().unwrap();
    let bundle = bundle_for(&crypt_key, &half);

    let helper = tokio::spawn(async move {
        rendezvous.meet().await;
        handle.cancel();
        rendezvous.meet().await;
    });

    assert_eq!(
        client
            .unwrap_client_half(&ctx, &bundle.ephemeral_public, &bundle.client_half)
            .await,
        Err(CryptoError::OperationCanceled)
    );
    helper.await.unwrap();
}

#[tokio::test]
async fn test_error_after_cancel_reports_canceled() {
    let (ctx, handle) = Context::with_cancel();
    let client = CryptoClient::new(CancelThenFail::new(handle));

    assert_eq!(
        client.sign(&ctx, b"msg").await,
        Err(CryptoError::OperationCanceled)
    );
}

#[tokio::test]
async fn test_remote_errors_are_returned_verbatim() {
    let ctx = Context::background();
    for err in [
        CryptoError::DecryptionFailed,
        CryptoError::NoMatchingKey,
        CryptoError::TransportFailure("socket closed".to_string()),
    ] {
        let remote = ScriptedTransport::new(Err(err.clone()));
        let client = CryptoClient::new(remote.clone());
        assert_eq!(client.sign(&ctx, b"msg").await, Err(err));
        assert_eq!(remote.calls(), 1);
    }
}

#[tokio::test]
async fn test_mismatched_reply_is_a_transport_failure() {
    let remote = ScriptedTransport::new(Ok(Response::Sign(Ed25519SignatureInfo {
        sig: vec![0; 64],
        public_key: [0; 32],
    })));
    let client = CryptoClient::new(remote);
    let (_, crypt_key) = device();
    let bundle = bundle_for(&crypt_key, &TlfCryptKeyClientHalf::generate().unwrap());

    let result = client
        .unwrap_client_half(
            &Context::background(),
            &bundle.ephemeral_public,
            &bundle.client_half,
        )
        .await;
    assert!(matches!(result, Err(CryptoError::TransportFailure(_))));
}

#[tokio::test]
async fn test_remote_sign_then_verify() {
    let (engine, _) = device();
    let kid = engine.verifying_key().kid();
    let client = CryptoClient::new(FakeRemote::new(engine));

    let info = client
        .sign(&Context::background(), b"hello folder")
        .await
        .unwrap();
    assert_eq!(info.verifying_key, kid);
    assert!(client.verify(b"hello folder", &info).is_ok());
    assert_eq!(
        client.verify(b"hello world", &info),
        Err(CryptoError::VerificationFailed)
    );
}

#[tokio::test]
async fn test_one_canceled_call_leaves_others_alone() {
    let (engine, crypt_key) = device();
    let client = CryptoClient::new(FakeRemote::new(engine));

    let half = TlfCryptKeyClientHalf::generate().unwrap();
    let bundle = bundle_for(&crypt_key, &half);
    let (canceled_ctx, handle) = Context::with_cancel();
    handle.cancel();

    let background = Context::background();
    let (canceled, signed, unboxed) = futures::join!(
        client.sign(&canceled_ctx, b"dropped"),
        client.sign(&background, b"kept"),
        client.unwrap_client_half(&background, &bundle.ephemeral_public, &bundle.client_half),
    );
    assert_eq!(canceled, Err(CryptoError::OperationCanceled));
    assert!(client.verify(b"kept", &signed.unwrap()).is_ok());
    assert_eq!(unboxed.unwrap(), half);
}
