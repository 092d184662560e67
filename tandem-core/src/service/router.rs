use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::hub::PeerHub;
use crate::models::{MemberInfo, PeerId, RoomCode, ServerEvent};
use crate::registry::SessionRegistry;
use crate::translate::TranslationGateway;
use crate::{Error, Result};

/// Which client event an utterance fans out as
#[derive(Clone, Copy)]
enum Channel {
    Chat,
    Speech,
}

/// One utterance being routed, pinned to the sender's identity at intake
/// time so a mid-flight profile change cannot relabel it.
struct Utterance<'a> {
    channel: Channel,
    room_id: &'a RoomCode,
    sender: &'a MemberInfo,
    original: &'a str,
    source_lang: &'a str,
}

impl Utterance<'_> {
    fn event(&self, text: String, target_lang: &str, should_speak: bool) -> ServerEvent {
        let room_id = self.room_id.clone();
        let sender_id = self.sender.peer_id.clone();
        let sender_name = self.sender.display_name.clone();
        let original_text = self.original.to_string();
        let source_lang = self.source_lang.to_string();
        let target_lang = target_lang.to_string();
        match self.channel {
            Channel::Chat => ServerEvent::ReceiveMessage {
                room_id,
                sender_id,
                sender_name,
                text,
                original_text,
                source_lang,
                target_lang,
                should_speak,
                timestamp: Utc::now(),
            },
            Channel::Speech => ServerEvent::PartnerSpeech {
                room_id,
                sender_id,
                sender_name,
                text,
                original_text,
                source_lang,
                target_lang,
                should_speak,
                timestamp: Utc::now(),
            },
        }
    }
}

/// Fans utterances out within a room: the sender gets its own words back
/// with `should_speak = false`, the partner gets the translation with
/// `should_speak = true`. Translation runs outside every room lock and its
/// result is dropped when the sender is gone by the time it lands.
#[derive(Clone)]
pub struct MessageRouter {
    registry: SessionRegistry,
    hub: PeerHub,
    gateway: Arc<TranslationGateway>,
}

impl MessageRouter {
    pub fn new(registry: SessionRegistry, hub: PeerHub, gateway: Arc<TranslationGateway>) -> Self {
        Self {
            registry,
            hub,
            gateway,
        }
    }

    /// Route typed chat text.
    pub async fn relay_text(&self, peer_id: &PeerId, code: &RoomCode, text: &str) -> Result<()> {
        self.route(peer_id, code, text, None, Channel::Chat).await
    }

    /// Route a finished speech transcript. `language`, when present,
    /// overrides the sender's stored language for this utterance.
    pub async fn relay_speech(
        &self,
        peer_id: &PeerId,
        code: &RoomCode,
        transcript: &str,
        language: Option<&str>,
    ) -> Result<()> {
        self.route(peer_id, code, transcript, language, Channel::Speech)
            .await
    }

    async fn route(
        &self,
        peer_id: &PeerId,
        code: &RoomCode,
        text: &str,
        override_language: Option<&str>,
        channel: Channel,
    ) -> Result<()> {
        let peer = self
            .registry
            .peer(peer_id)
            .ok_or_else(|| Error::PeerNotFound(peer_id.clone()))?;
        let room = self
            .registry
            .lookup_room(code)
            .ok_or_else(|| Error::RoomNotFound(code.clone()))?;
        let mut sender = room
            .member(peer_id)
            .ok_or_else(|| Error::NotInRoom(peer_id.clone()))?;

        if let Some(language) = override_language.map(str::trim).filter(|l| !l.is_empty()) {
            if language != sender.language {
                // Persisting only works while a seat is still open; the
                // utterance itself always uses the announced language.
                if room.update_member_language(peer_id, language) {
                    peer.set_language(language);
                    debug!(
                        room_id = %room.code,
                        peer_id = %peer_id,
                        language,
                        "member language updated"
                    );
                }
                sender.language = language.to_string();
            }
        }

        let utterance = Utterance {
            channel,
            room_id: &room.code,
            sender: &sender,
            original: text,
            source_lang: &sender.language,
        };

        // Echo first so the sender's UI never waits on a provider.
        self.hub
            .send_to(peer_id, utterance.event(text.to_string(), &sender.language, false));

        let Some(partner) = room.others(peer_id).into_iter().next() else {
            return Ok(());
        };

        // Translation runs with no room lock held.
        let (translated, tier) = self
            .gateway
            .translate(text, &sender.language, &partner.language)
            .await;

        // Either seat may have changed hands while we were translating.
        if !room.is_member(peer_id) {
            debug!(
                room_id = %room.code,
                peer_id = %peer_id,
                "sender left mid-translation, result dropped"
            );
            return Ok(());
        }
        if !room.is_member(&partner.peer_id) {
            return Ok(());
        }

        self.hub.send_to(
            &partner.peer_id,
            utterance.event(translated.clone(), &partner.language, true),
        );
        self.hub.send_to(
            peer_id,
            ServerEvent::TranslationResult {
                room_id: room.code.clone(),
                original_text: text.to_string(),
                text: translated,
                source_lang: sender.language.clone(),
                target_lang: partner.language.clone(),
                tier,
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Room, SessionKind};
    use crate::test_helpers::{drain_events, test_peer_id};
    use crate::translate::{ProviderError, TranslationProvider, TranslationTier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::Notify;

    /// Counts calls and upper-cases the input.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
    }

    /// Blocks until released, then translates. Lets a test change room
    /// state while a translation is in flight.
    struct GatedProvider {
        reached: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl TranslationProvider for GatedProvider {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> std::result::Result<String, ProviderError> {
            self.reached.notify_one();
            self.release.notified().await;
            Ok(format!("[{text}]"))
        }
    }

    struct Fixture {
        router: MessageRouter,
        registry: SessionRegistry,
        hub: PeerHub,
        room: Arc<Room>,
    }

    fn fixture(providers: Vec<Arc<dyn TranslationProvider>>) -> Fixture {
        let registry = SessionRegistry::new();
        let hub = PeerHub::new();
        let gateway = Arc::new(TranslationGateway::new(
            providers,
            Duration::from_secs(5),
        ));
        let router = MessageRouter::new(registry.clone(), hub.clone(), gateway);
        let room = Arc::new(Room::new(SessionKind::Voice));
        registry.insert_room(Arc::clone(&room));
        Fixture {
            router,
            registry,
            hub,
            room,
        }
    }

    impl Fixture {
        fn seat(
            &self,
            id: &str,
            name: &str,
            language: &str,
        ) -> (PeerId, UnboundedReceiver<ServerEvent>) {
            let peer_id = test_peer_id(id);
            let peer = self.registry.register_peer(peer_id.clone());
            peer.set_profile(name, language);
            let rx = self.hub.attach(peer_id.clone());
            self.room
                .try_add_member(MemberInfo::new(peer_id.clone(), name, language))
                .unwrap();
            peer.set_room(self.room.code.clone());
            (peer_id, rx)
        }
    }

    #[tokio::test]
    async fn test_alone_in_room_gets_echo_only() {
        let provider = Arc::new(CountingProvider::default());
        let fx = fixture(vec![Arc::clone(&provider) as Arc<dyn TranslationProvider>]);
        let (alice, mut rx) = fx.seat("alice", "Alice", "en");

        fx.router
            .relay_text(&alice, &fx.room.code, "anyone here?")
            .await
            .unwrap();

        let events = drain_events(&mut rx);
        assert_eq!(events.len(), 1);
        if let ServerEvent::ReceiveMessage {
            text, should_speak, ..
        } = &events[0]
        {
            assert_eq!(text, "anyone here?");
            assert!(!should_speak);
        } else {
            panic!("expected receive-message echo");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sender_never_told_to_speak() {
        let fx = fixture(vec![]);
        let (alice, mut alice_rx) = fx.seat("alice", "Alice", "en");
        let (_bob, mut bob_rx) = fx.seat("bob", "Bob", "es");

        fx.router
            .relay_text(&alice, &fx.room.code, "hello")
            .await
            .unwrap();

        for event in drain_events(&mut alice_rx) {
            if let ServerEvent::ReceiveMessage { should_speak, .. } = event {
                assert!(!should_speak);
            }
        }
        let spoken: Vec<bool> = drain_events(&mut bob_rx)
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::ReceiveMessage { should_speak, .. } => Some(should_speak),
                _ => None,
            })
            .collect();
        assert_eq!(spoken, vec![true]);
    }

    #[tokio::test]
    async fn test_phrase_tier_translates_without_providers() {
        let fx = fixture(vec![]);
        let (alice, mut alice_rx) = fx.seat("alice", "Alice", "en");
        let (_bob, mut bob_rx) = fx.seat("bob", "Bob", "es");

        fx.router
            .relay_text(&alice, &fx.room.code, "hello")
            .await
            .unwrap();

        let bob_events = drain_events(&mut bob_rx);
        assert_eq!(bob_events.len(), 1);
        if let ServerEvent::ReceiveMessage {
            text,
            original_text,
            source_lang,
            target_lang,
            should_speak,
            ..
        } = &bob_events[0]
        {
            assert_eq!(text, "hola");
            assert_eq!(original_text, "hello");
            assert_eq!(source_lang, "en");
            assert_eq!(target_lang, "es");
            assert!(should_speak);
        } else {
            panic!("expected translated delivery");
        }

        let alice_events = drain_events(&mut alice_rx);
        assert_eq!(alice_events.len(), 2);
        if let ServerEvent::TranslationResult { text, tier, .. } = &alice_events[1] {
            assert_eq!(text, "hola");
            assert_eq!(*tier, TranslationTier::Phrase);
        } else {
            panic!("expected translation-result after delivery");
        }
    }

    #[tokio::test]
    async fn test_speech_reaches_partner_as_partner_speech() {
        let fx = fixture(vec![]);
        let (alice, _alice_rx) = fx.seat("alice", "Alice", "en");
        let (_bob, mut bob_rx) = fx.seat("bob", "Bob", "es");

        fx.router
            .relay_speech(&alice, &fx.room.code, "thank you", None)
            .await
            .unwrap();

        let bob_events = drain_events(&mut bob_rx);
        assert_eq!(bob_events.len(), 1);
        assert!(matches!(
            &bob_events[0],
            ServerEvent::PartnerSpeech { text, .. } if text == "gracias"
        ));
    }

    #[tokio::test]
    async fn test_speech_language_override_persists_while_alone() {
        let fx = fixture(vec![]);
        let (alice, mut rx) = fx.seat("alice", "Alice", "en");

        fx.router
            .relay_speech(&alice, &fx.room.code, "bonjour", Some("fr"))
            .await
            .unwrap();

        let events = drain_events(&mut rx);
        assert!(matches!(
            &events[0],
            ServerEvent::PartnerSpeech { source_lang, .. } if source_lang == "fr"
        ));
        assert_eq!(
            fx.room.member(&alice).unwrap().language,
            "fr",
            "stored language follows the override while a seat is open"
        );
        assert_eq!(fx.registry.peer(&alice).unwrap().language(), "fr");
    }

    #[tokio::test]
    async fn test_speech_language_override_is_transient_at_capacity() {
        let fx = fixture(vec![]);
        let (alice, _alice_rx) = fx.seat("alice", "Alice", "en");
        let (_bob, mut bob_rx) = fx.seat("bob", "Bob", "es");

        fx.router
            .relay_speech(&alice, &fx.room.code, "merci", Some("fr"))
            .await
            .unwrap();

        // The utterance went out as French but the stored profile held.
        let bob_events = drain_events(&mut bob_rx);
        assert!(matches!(
            &bob_events[0],
            ServerEvent::PartnerSpeech { source_lang, .. } if source_lang == "fr"
        ));
        assert_eq!(fx.room.member(&alice).unwrap().language, "en");
    }

    #[tokio::test]
    async fn test_sender_departure_mid_translation_drops_result() {
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let provider = Arc::new(GatedProvider {
            reached: Arc::clone(&reached),
            release: Arc::clone(&release),
        });
        let fx = fixture(vec![provider as Arc<dyn TranslationProvider>]);
        let (alice, mut alice_rx) = fx.seat("alice", "Alice", "en");
        let (_bob, mut bob_rx) = fx.seat("bob", "Bob", "de");

        let router = fx.router.clone();
        let room_code = fx.room.code.clone();
        let sender = alice.clone();
        let flight = tokio::spawn(async move {
            router
                .relay_text(&sender, &room_code, "wait for it")
                .await
        });

        // Sender leaves while the provider is holding the translation.
        reached.notified().await;
        fx.room.remove_member(&alice).unwrap();
        release.notify_one();
        flight.await.unwrap().unwrap();

        let bob_events = drain_events(&mut bob_rx);
        assert!(
            bob_events.is_empty(),
            "partner must not receive a departed sender's words"
        );
        // Echo was already out before the departure; no translation-result.
        let alice_events = drain_events(&mut alice_rx);
        assert_eq!(alice_events.len(), 1);
        assert!(matches!(
            &alice_events[0],
            ServerEvent::ReceiveMessage { should_speak: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_message_from_non_member() {
        let fx = fixture(vec![]);
        let outsider = test_peer_id("outsider");
        fx.registry.register_peer(outsider.clone());

        let err = fx
            .router
            .relay_text(&outsider, &fx.room.code, "knock knock")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotInRoom(_)));
    }

    #[tokio::test]
    async fn test_message_to_unknown_room() {
        let fx = fixture(vec![]);
        let (alice, _rx) = fx.seat("alice", "Alice", "en");

        let err = fx
            .router
            .relay_text(&alice, &RoomCode::from_string("NOSUCH01".to_string()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RoomNotFound(_)));
    }
}
