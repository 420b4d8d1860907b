use crate::error::{DmError, Result};
use crate::services::message_classifier::MessageContent;
use crate::services::peer_directory::build_label;
use crate::state::AppState;

/// A line typed into the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Peers(Option<String>),
    Open(String),
    Reload,
    Add(String),
    Raw(usize),
    Orders,
    Order { order_id: String, event_id: String },
    Push(String),
    Send(String),
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(ConsoleCommand::Send(line.to_string()));
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &str| -> std::result::Result<String, String> {
            if rest.is_empty() {
                Err(format!("{} needs {}", name, what))
            } else {
                Ok(rest.to_string())
            }
        };

        match name {
            "/peers" => Ok(ConsoleCommand::Peers(
                Some(rest.to_string()).filter(|q| !q.is_empty()),
            )),
            "/open" => required("a public key").map(ConsoleCommand::Open),
            "/reload" => Ok(ConsoleCommand::Reload),
            "/add" => required("a public key").map(ConsoleCommand::Add),
            "/raw" => required("a message index")?
                .parse()
                .map(ConsoleCommand::Raw)
                .map_err(|_| format!("Not a message index: {}", rest)),
            "/orders" => Ok(ConsoleCommand::Orders),
            "/order" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(order_id), Some(event_id)) => Ok(ConsoleCommand::Order {
                        order_id: order_id.to_string(),
                        event_id: event_id.to_string(),
                    }),
                    _ => Err("/order needs an order id and an event id".to_string()),
                }
            }
            "/push" => required("a JSON frame").map(ConsoleCommand::Push),
            "/help" => Ok(ConsoleCommand::Help),
            "/quit" | "/exit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

const HELP: &str = "\
/peers [query]          list peers, optionally filtered
/open <key>             open the conversation with a peer
/reload                 reload the open conversation and the peer list
/add <key>              add a peer and open it
/raw <index>            show the raw body of a message
/orders                 show orders for the open peer
/order <id> <event>     show one order
/push <json>            feed a push frame
/quit                   exit
anything else is sent to the open peer";

/// Run one command and return the lines to print.
pub async fn execute(state: &AppState, command: ConsoleCommand) -> Result<Vec<String>> {
    let panel = &state.panel;
    match command {
        ConsoleCommand::Peers(query) => {
            let labels = panel.peer_labels(query.as_deref().unwrap_or("")).await;
            let active = panel.active_peer().await;
            let mut lines: Vec<String> = labels
                .into_iter()
                .map(|(key, label)| {
                    let marker = if active.as_deref() == Some(key.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    format!("{} {}", marker, label)
                })
                .collect();
            lines.push(format!(
                "{} peer(s) with unread messages",
                panel.unread_total().await
            ));
            Ok(lines)
        }
        ConsoleCommand::Open(key) => {
            panel.set_active_peer(Some(&key)).await?;
            conversation_lines(state).await
        }
        ConsoleCommand::Reload => {
            panel.reselect_active_peer().await?;
            conversation_lines(state).await
        }
        ConsoleCommand::Add(key) => {
            let peer = panel.add_peer(&key).await?;
            Ok(vec![format!("Added {}", build_label(&peer))])
        }
        ConsoleCommand::Raw(index) => match panel.raw_message(index).await {
            Some(raw) => Ok(vec![raw]),
            None => {
                let loaded = panel.messages().await.len();
                Ok(vec![match loaded {
                    0 => "No messages loaded".to_string(),
                    n => format!("No message at index {}, use /raw 0..{}", index, n - 1),
                }])
            }
        },
        ConsoleCommand::Orders => {
            if panel.active_peer().await.is_none() {
                return Err(DmError::NoActivePeer);
            }
            panel.show_client_orders().await;
            Ok(Vec::new())
        }
        ConsoleCommand::Order { order_id, event_id } => {
            panel.show_order_details(&order_id, &event_id);
            Ok(Vec::new())
        }
        ConsoleCommand::Push(frame) => {
            panel.handle_push_frame(&frame).await?;
            conversation_lines(state).await
        }
        ConsoleCommand::Send(text) => {
            if text.is_empty() {
                return Ok(Vec::new());
            }
            panel.set_draft(&text).await;
            match panel.send_message().await? {
                Some(_) => conversation_lines(state).await,
                None => Err(DmError::NoActivePeer),
            }
        }
        ConsoleCommand::Help => Ok(HELP.lines().map(str::to_string).collect()),
        ConsoleCommand::Quit => Ok(Vec::new()),
    }
}

/// The open conversation, one line per message.
pub async fn conversation_lines(state: &AppState) -> Result<Vec<String>> {
    let rendered = state.panel.rendered_messages().await;
    Ok(rendered
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let direction = if item.message.incoming { "<" } else { ">" };
            let body = match &item.content {
                MessageContent::Text(text) => text.clone(),
                MessageContent::Structured(_) => format!(
                    "[structured message type {}] /raw {}",
                    item.content.payload_type().unwrap_or_default(),
                    index
                ),
            };
            format!("{:>3} {} {}", index, direction, body)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dm_gateway::MockDmGateway;
    use crate::services::dm_types::DirectMessage;
    use crate::services::{ChannelHost, DirectMessagesPanel, PanelSettings};
    use rstest::rstest;
    use std::sync::Arc;

    fn state_with(gateway: MockDmGateway) -> AppState {
        let (host, _notices) = ChannelHost::new();
        AppState {
            panel: Arc::new(DirectMessagesPanel::new(
                Arc::new(gateway),
                Arc::new(host),
                &PanelSettings::default(),
            )),
        }
    }

    #[tokio::test]
    async fn test_raw_out_of_range_prints_usage() {
        let mut gateway = MockDmGateway::new();
        gateway.expect_list_messages().returning(|_| {
            Ok(vec![DirectMessage {
                id: None,
                event_id: "e1".to_string(),
                peer_key: "A".to_string(),
                body: r#"{"type":0}"#.to_string(),
                created_at: 1,
                incoming: true,
                message_type: -1,
            }])
        });
        let state = state_with(gateway);

        let lines = execute(&state, ConsoleCommand::Raw(0)).await.unwrap();
        assert_eq!(lines, vec!["No messages loaded"]);

        state.panel.set_active_peer(Some("A")).await.unwrap();
        let lines = execute(&state, ConsoleCommand::Raw(0)).await.unwrap();
        assert_eq!(lines, vec![r#"{"type":0}"#]);

        let lines = execute(&state, ConsoleCommand::Raw(5)).await.unwrap();
        assert_eq!(lines, vec!["No message at index 5, use /raw 0..0"]);
    }

    #[rstest]
    #[case("hello there", ConsoleCommand::Send("hello there".to_string()))]
    #[case("/peers", ConsoleCommand::Peers(None))]
    #[case("/peers  ali ", ConsoleCommand::Peers(Some("ali".to_string())))]
    #[case("/open abc", ConsoleCommand::Open("abc".to_string()))]
    #[case("/reload", ConsoleCommand::Reload)]
    #[case("/add k1", ConsoleCommand::Add("k1".to_string()))]
    #[case("/raw 3", ConsoleCommand::Raw(3))]
    #[case("/orders", ConsoleCommand::Orders)]
    #[case(
        "/order o1 e1",
        ConsoleCommand::Order { order_id: "o1".to_string(), event_id: "e1".to_string() }
    )]
    #[case("/exit", ConsoleCommand::Quit)]
    fn test_parse(#[case] line: &str, #[case] expected: ConsoleCommand) {
        assert_eq!(ConsoleCommand::parse(line), Ok(expected));
    }

    #[rstest]
    #[case("/open")]
    #[case("/raw x")]
    #[case("/order o1")]
    #[case("/bogus")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(ConsoleCommand::parse(line).is_err());
    }

    #[test]
    fn test_push_keeps_frame_intact() {
        let frame = r#"{"type":"dm:1","peerPubkey":"A","dm":{}}"#;
        assert_eq!(
            ConsoleCommand::parse(&format!("/push {}", frame)),
            Ok(ConsoleCommand::Push(frame.to_string()))
        );
    }
}
