//! The connection-phase simulator.
//!
//! A linear state machine: replay the recorded greeting, read the client's
//! answer, optionally upgrade to TLS, pick the config mock whose recorded
//! handshake matches the live one, then walk that mock's auth exchange to
//! its terminal OK or ERR. Salt-derived payloads (auth responses, encrypted
//! passwords) are validated by sequence id only.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::codec::{self, last_op, ConnContext};
use crate::error::Result;
use crate::matcher::{self, compat};
use crate::mock::{Mock, MockStore, MockType};
use crate::net::{BufferedSocket, TlsUpgrade};
use crate::protocol::auth::Sha2AuthState;
use crate::protocol::connect::HandshakeResponse;
use crate::protocol::{Message, Packet};

/// Drive the connection phase. Returns the (possibly TLS-upgraded) socket
/// and a populated decode context for the command phase.
pub(crate) async fn simulate(
    mut conn: BufferedSocket,
    store: &dyn MockStore,
    tls: Option<&Arc<dyn TlsUpgrade>>,
    backdate: Duration,
) -> Result<(BufferedSocket, ConnContext)> {
    let mut ctx = ConnContext::new();

    let configs: Vec<Arc<Mock>> = store
        .get_unfiltered_mocks()
        .await?
        .into_iter()
        .filter(|mock| mock.mock_type() == MockType::Config)
        .collect();

    // 1. Greeting: replay the first recorded greeting as-is.
    let Some(first) = configs.first() else {
        return Err(err_handshake!("no config mocks to greet the client with"));
    };

    let greeting_packet = first
        .responses
        .first()
        .filter(|packet| matches!(packet.message, Message::HandshakeV10(_)))
        .ok_or_else(|| err_handshake!("config mock {} has no greeting", first.name))?
        .clone();

    if let Message::HandshakeV10(greeting) = &greeting_packet.message {
        ctx.store_greeting(greeting.clone());
    }

    send(&mut conn, &mut ctx, &greeting_packet).await?;

    // 2. Await the client's answer: SSLRequest or HandshakeResponse41.
    let mut reply = read(&mut conn, &mut ctx).await?;

    let candidates = if let Message::SslRequest(live_ssl) = &reply.message {
        // strict filter: only config mocks whose recorded connection also
        // began with a matching SSLRequest can replay this session
        let filtered: Vec<Arc<Mock>> = configs
            .iter()
            .filter(|mock| {
                matches!(
                    mock.requests.first().map(|p| &p.message),
                    Some(Message::SslRequest(recorded)) if matcher::ssl_requests_match(recorded, live_ssl)
                )
            })
            .cloned()
            .collect();

        if filtered.is_empty() {
            return Err(err_handshake!("no config mock matches the SSL request"));
        }

        conn = upgrade_to_tls(conn, tls, backdate).await?;
        debug!("connection upgraded to TLS");

        reply = read(&mut conn, &mut ctx).await?;

        filtered
    } else {
        configs
    };

    let Message::HandshakeResponse41(live_response) = &reply.message else {
        return Err(err_handshake!(
            "expected HandshakeResponse41 but client sent {}",
            reply.message.kind()
        ));
    };

    // 3. Select the config mock whose recorded handshake response matches.
    // Index 0 or 1: recordings over TLS carry the SSLRequest first.
    let Some((mock, response_index)) = select_handshake_mock(&candidates, live_response) else {
        return Err(err_handshake!("no config mock matches the handshake response"));
    };

    if let Some(Message::HandshakeResponse41(recorded)) =
        mock.requests.get(response_index).map(|p| &p.message)
    {
        ctx.recorded_client_capabilities = recorded.capabilities;
    }

    debug!(mock = %mock.name, "selected handshake mock");

    // 4. Walk the recorded auth exchange.
    run_auth_exchange(&mut conn, &mut ctx, store, mock, response_index + 1).await?;

    Ok((conn, ctx))
}

fn select_handshake_mock<'a>(
    candidates: &'a [Arc<Mock>],
    live: &HandshakeResponse,
) -> Option<(&'a Arc<Mock>, usize)> {
    for mock in candidates {
        for index in [0, 1] {
            if let Some(Message::HandshakeResponse41(recorded)) =
                mock.requests.get(index).map(|p| &p.message)
            {
                if matcher::handshake_responses_match(recorded, live) {
                    return Some((mock, index));
                }
            }
        }
    }

    None
}

/// Walk responses from `resp_index` (the packet after the greeting) and
/// requests from `req_index` (the packet after the handshake response),
/// replaying the server side and pacing on the client side.
async fn run_auth_exchange(
    conn: &mut BufferedSocket,
    ctx: &mut ConnContext,
    store: &dyn MockStore,
    mock: &Arc<Mock>,
    mut req_index: usize,
) -> Result<()> {
    let mut resp_index = 1;

    loop {
        let response = mock
            .responses
            .get(resp_index)
            .ok_or_else(|| {
                err_handshake!("config mock {} exhausted before a terminal OK", mock.name)
            })?
            .clone();

        match &response.message {
            Message::AuthSwitchRequest(switch) => {
                ctx.auth_plugin = switch.plugin.clone();
                send(conn, ctx, &response).await?;
                ctx.last_op = last_op::AUTH_SWITCH_SENT;

                // the response payload is salt-derived; only the sequence id
                // is checked against the recording
                let answer = read(conn, ctx).await?;
                expect_seq(mock, req_index, &answer)?;
                req_index += 1;
                resp_index += 1;
            }

            Message::Ok(_) | Message::Err(_) => {
                // native-password terminal: forward and mark consumed (other
                // connections may still replay this user's handshake)
                send(conn, ctx, &response).await?;

                if !store.update_unfiltered_mock(mock, mock.consumed()).await {
                    return Err(err_handshake!(
                        "config mock {} was consumed by a concurrent session",
                        mock.name
                    ));
                }

                return Ok(());
            }

            Message::AuthMoreData(more) => match more.sha2_state() {
                Some(Sha2AuthState::FastAuthSuccess) => {
                    send(conn, ctx, &response).await?;

                    let terminal = mock.responses.get(resp_index + 1).ok_or_else(|| {
                        err_handshake!("config mock {} ends after fast-auth", mock.name)
                    })?;
                    send(conn, ctx, terminal).await?;

                    if !store.update_unfiltered_mock(mock, mock.consumed()).await {
                        return Err(err_handshake!(
                            "config mock {} was consumed by a concurrent session",
                            mock.name
                        ));
                    }

                    return Ok(());
                }

                Some(Sha2AuthState::PerformFullAuthentication) => {
                    send(conn, ctx, &response).await?;
                    ctx.last_op = last_op::FULL_AUTH_REQUESTED;
                    resp_index += 1;

                    if !ctx.use_ssl {
                        // plaintext connection: the client fetches the
                        // server's RSA key before encrypting its password
                        let request = read(conn, ctx).await?;
                        if !matches!(request.message, Message::PublicKeyRequest) {
                            return Err(err_handshake!(
                                "expected public-key request but client sent {}",
                                request.message.kind()
                            ));
                        }
                        expect_header(mock, req_index, &request)?;
                        req_index += 1;

                        let key = mock.responses.get(resp_index).ok_or_else(|| {
                            err_handshake!("config mock {} has no public key", mock.name)
                        })?;
                        send(conn, ctx, key).await?;
                        ctx.last_op = last_op::PUBLIC_KEY_SENT;
                        resp_index += 1;
                    }

                    // over TLS the password arrives in the clear; otherwise
                    // RSA-encrypted — opaque either way
                    let password = read(conn, ctx).await?;
                    expect_seq(mock, req_index, &password)?;

                    let terminal = mock.responses.get(resp_index).ok_or_else(|| {
                        err_handshake!("config mock {} ends before the final OK", mock.name)
                    })?;
                    send(conn, ctx, terminal).await?;

                    // full authentication happens once per user; the mock
                    // cannot be replayed again
                    store.delete_unfiltered_mock(mock).await;

                    return Ok(());
                }

                None => {
                    return Err(err_handshake!(
                        "unknown caching-sha2 mechanism byte 0x{:02x?}",
                        more.data.first().copied().unwrap_or_default()
                    ));
                }
            },

            other => {
                return Err(err_handshake!(
                    "unexpected {} in config mock {}",
                    other.kind(),
                    mock.name
                ));
            }
        }
    }
}

async fn upgrade_to_tls(
    conn: BufferedSocket,
    tls: Option<&Arc<dyn TlsUpgrade>>,
    backdate: Duration,
) -> Result<BufferedSocket> {
    let Some(upgrader) = tls else {
        return Err(err_handshake!(
            "client requested SSL but no TLS collaborator is configured"
        ));
    };

    let mut conn = conn;
    let prefix = conn.peek(8).await?.to_vec();

    if !upgrader.is_tls_handshake(&prefix) {
        // not a client hello; leave the stream as-is (mixed-mode clients)
        return Ok(conn);
    }

    let (stream, buffered) = conn.into_parts();
    let upgraded = upgrader.upgrade(stream, buffered, backdate).await?;

    Ok(BufferedSocket::new(upgraded))
}

async fn send(conn: &mut BufferedSocket, ctx: &mut ConnContext, packet: &Packet) -> Result<()> {
    let frame = codec::encode_packet(packet, ctx);
    conn.write_all(&frame).await?;
    ctx.note_sent(&packet.message);

    Ok(())
}

async fn read(conn: &mut BufferedSocket, ctx: &mut ConnContext) -> Result<Packet> {
    let (header, payload) = conn
        .read_packet()
        .await?
        .ok_or_else(|| err_handshake!("client disconnected during the handshake"))?;

    codec::decode_payload(ctx, header, payload)
}

fn expect_seq(mock: &Mock, req_index: usize, packet: &Packet) -> Result<()> {
    let recorded = recorded_request(mock, req_index)?;

    if recorded.header.seq_id != packet.header.seq_id {
        return Err(err_handshake!(
            "expected sequence id {} but client sent {}",
            recorded.header.seq_id,
            packet.header.seq_id
        ));
    }

    Ok(())
}

fn expect_header(mock: &Mock, req_index: usize, packet: &Packet) -> Result<()> {
    let recorded = recorded_request(mock, req_index)?;

    if !compat::headers_match(&recorded.header, &packet.header) {
        return Err(err_handshake!(
            "client packet header diverges from the recording at request {}",
            req_index
        ));
    }

    Ok(())
}

fn recorded_request(mock: &Mock, req_index: usize) -> Result<&Packet> {
    mock.requests.get(req_index).ok_or_else(|| {
        err_handshake!(
            "config mock {} has no recorded request at index {}",
            mock.name,
            req_index
        )
    })
}
