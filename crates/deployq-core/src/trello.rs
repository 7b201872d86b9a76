//! [`BoardGateway`] over the Trello REST API.
//!
//! Credentials travel as `key`/`token` query parameters on every request.
//! Non-2xx responses become [`DeployqError::BoardStatus`] carrying the
//! response body so the log says what the service objected to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::board::{BoardGateway, BoardList, Position};
use crate::card::{Card, Comment};
use crate::config::BoardConfig;
use crate::error::{DeployqError, Result};

pub struct TrelloBoard {
    http: Client,
    api_base: String,
    key: String,
    token: String,
}

// Wire shapes that don't map one-to-one onto the domain types.

#[derive(Deserialize)]
struct ListWithCards {
    #[serde(default)]
    cards: Vec<Card>,
}

#[derive(Deserialize)]
struct BoardWithLists {
    #[serde(default)]
    lists: Vec<BoardList>,
}

#[derive(Deserialize)]
struct CommentAction {
    id: String,
    date: DateTime<Utc>,
    data: CommentData,
}

#[derive(Deserialize)]
struct CommentData {
    #[serde(default)]
    text: String,
}

impl From<CommentAction> for Comment {
    fn from(a: CommentAction) -> Self {
        Comment {
            id: a.id,
            text: a.data.text,
            date: a.date,
        }
    }
}

impl TrelloBoard {
    pub fn new(api_base: impl Into<String>, key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key: key.into(),
            token: token.into(),
        }
    }

    /// Build from config; credentials must already be resolved.
    pub fn from_config(board: &BoardConfig) -> Result<Self> {
        let key = board
            .key
            .clone()
            .ok_or_else(|| DeployqError::InvalidConfig("board key missing (TRELLO_KEY)".into()))?;
        let token = board.token.clone().ok_or_else(|| {
            DeployqError::InvalidConfig("board token missing (TRELLO_TOKEN)".into())
        })?;
        Ok(Self::new(board.api_base.clone(), key, token))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .query(&[("key", self.key.as_str()), ("token", self.token.as_str())])
    }

    async fn send(&self, endpoint: &str, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeployqError::BoardStatus {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let req = self.request(reqwest::Method::GET, path).query(query);
        let resp = self.send(&format!("GET {path}"), req).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl BoardGateway for TrelloBoard {
    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>> {
        let list: ListWithCards = self
            .get_json(&format!("/1/lists/{list_id}"), &[("cards", "open")])
            .await?;
        Ok(list.cards)
    }

    async fn list_comments(&self, card_id: &str) -> Result<Vec<Comment>> {
        let actions: Vec<CommentAction> = self
            .get_json(
                &format!("/1/cards/{card_id}/actions"),
                &[("filter", "commentCard")],
            )
            .await?;
        Ok(actions.into_iter().map(Comment::from).collect())
    }

    async fn add_card(&self, list_id: &str, name: &str) -> Result<Card> {
        let path = format!("/1/lists/{list_id}/cards");
        let req = self
            .request(reqwest::Method::POST, &path)
            .json(&serde_json::json!({ "name": name }));
        let resp = self.send(&format!("POST {path}"), req).await?;
        let card: Card = resp.json().await?;
        tracing::debug!(card = %card.id, list = %list_id, name = %name, "card added");
        Ok(card)
    }

    async fn move_card(
        &self,
        card_id: &str,
        list_id: &str,
        position: Option<Position>,
    ) -> Result<()> {
        let path = format!("/1/cards/{card_id}");
        let mut body = serde_json::json!({ "idList": list_id });
        if let Some(pos) = position {
            body["pos"] = serde_json::Value::from(pos.as_str());
        }
        let req = self.request(reqwest::Method::PUT, &path).json(&body);
        self.send(&format!("PUT {path}"), req).await?;
        tracing::debug!(card = %card_id, list = %list_id, ?position, "card moved");
        Ok(())
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()> {
        let path = format!("/1/cards/{card_id}/actions/comments");
        let req = self
            .request(reqwest::Method::POST, &path)
            .json(&serde_json::json!({ "text": text }));
        self.send(&format!("POST {path}"), req).await?;
        tracing::debug!(card = %card_id, text = %text, "comment added");
        Ok(())
    }

    async fn list_lists(&self, board_id: &str) -> Result<Vec<BoardList>> {
        let board: BoardWithLists = self
            .get_json(
                &format!("/1/boards/{board_id}"),
                &[("lists", "open"), ("list_fields", "name")],
            )
            .await?;
        Ok(board.lists)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn auth() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("key".into(), "k".into()),
            Matcher::UrlEncoded("token".into(), "t".into()),
        ])
    }

    fn board(server: &mockito::Server) -> TrelloBoard {
        TrelloBoard::new(server.url(), "k", "t")
    }

    #[tokio::test]
    async fn list_cards_reads_open_cards_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/1/lists/q1")
            .match_query(Matcher::AllOf(vec![
                auth(),
                Matcher::UrlEncoded("cards".into(), "open".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"q1","name":"In Line","cards":[
                    {"id":"c1","name":"alice","dateLastActivity":"2016-03-01T12:00:00.000Z","pos":1},
                    {"id":"c2","name":"bob+carol","dateLastActivity":"2016-03-01T12:05:00.000Z","pos":2}
                ]}"#,
            )
            .create_async()
            .await;

        let cards = board(&server).list_cards("q1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "c1");
        assert!(cards[1].has_user("carol"));
    }

    #[tokio::test]
    async fn list_comments_flattens_actions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/1/cards/c1/actions")
            .match_query(Matcher::UrlEncoded("filter".into(), "commentCard".into()))
            .with_body(
                r#"[
                    {"id":"a2","date":"2016-03-01T12:06:00.000Z","type":"commentCard","data":{"text":"Notified alice they're up"}},
                    {"id":"a1","date":"2016-03-01T12:01:00.000Z","type":"commentCard","data":{"text":"Deploy failed!"}}
                ]"#,
            )
            .create_async()
            .await;

        let comments = board(&server).list_comments("c1").await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "a2");
        assert_eq!(comments[0].text, "Notified alice they're up");
    }

    #[tokio::test]
    async fn add_card_posts_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/1/lists/q1/cards")
            .match_query(auth())
            .match_body(Matcher::Json(serde_json::json!({ "name": "alice" })))
            .with_body(r#"{"id":"new","name":"alice","dateLastActivity":"2016-03-01T12:00:00.000Z"}"#)
            .create_async()
            .await;

        let card = board(&server).add_card("q1", "alice").await.unwrap();
        mock.assert_async().await;
        assert_eq!(card.id, "new");
    }

    #[tokio::test]
    async fn move_card_sends_position_only_when_given() {
        let mut server = mockito::Server::new_async().await;
        let with_pos = server
            .mock("PUT", "/1/cards/c1")
            .match_query(auth())
            .match_body(Matcher::Json(
                serde_json::json!({ "idList": "q1", "pos": "bottom" }),
            ))
            .with_body("{}")
            .create_async()
            .await;
        let without_pos = server
            .mock("PUT", "/1/cards/c2")
            .match_body(Matcher::Json(serde_json::json!({ "idList": "r1" })))
            .with_body("{}")
            .create_async()
            .await;

        let b = board(&server);
        b.move_card("c1", "q1", Some(Position::Bottom)).await.unwrap();
        b.move_card("c2", "r1", None).await.unwrap();
        with_pos.assert_async().await;
        without_pos.assert_async().await;
    }

    #[tokio::test]
    async fn add_comment_posts_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/1/cards/c1/actions/comments")
            .match_body(Matcher::Json(serde_json::json!({ "text": "Deploy succeeded!" })))
            .with_body("{}")
            .create_async()
            .await;

        board(&server)
            .add_comment("c1", "Deploy succeeded!")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_lists_reads_board_lists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/1/boards/b1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lists".into(), "open".into()),
                Matcher::UrlEncoded("list_fields".into(), "name".into()),
            ]))
            .with_body(
                r#"{"id":"b1","lists":[{"id":"q1","name":"In Line"},{"id":"r1","name":"Deploying"}]}"#,
            )
            .create_async()
            .await;

        let lists = board(&server).list_lists("b1").await.unwrap();
        assert_eq!(
            lists,
            vec![
                BoardList { id: "q1".into(), name: "In Line".into() },
                BoardList { id: "r1".into(), name: "Deploying".into() },
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/1/lists/q1")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("invalid token")
            .create_async()
            .await;

        let err = board(&server).list_cards("q1").await.unwrap_err();
        match err {
            DeployqError::BoardStatus { status, endpoint, body } => {
                assert_eq!(status, 401);
                assert_eq!(endpoint, "GET /1/lists/q1");
                assert_eq!(body, "invalid token");
            }
            other => panic!("expected BoardStatus, got {other:?}"),
        }
    }

    #[test]
    fn from_config_requires_credentials() {
        let mut cfg = crate::config::Config::new("b1");
        assert!(matches!(
            TrelloBoard::from_config(&cfg.board),
            Err(DeployqError::InvalidConfig(_))
        ));
        cfg.board.key = Some("k".into());
        cfg.board.token = Some("t".into());
        assert!(TrelloBoard::from_config(&cfg.board).is_ok());
    }
}
