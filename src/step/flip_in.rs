use super::{MachineContext, ProviderKey, Step, StepDefinition, StepFactory};
use crate::animation::{FlipInTransition, ParallelTransition};
use crate::card::{CardBuilder, CardMetrics};
use crate::config::FlipInConfig;
use crate::error::StepError;
use crate::feeds::{AvatarProvider, PostStreamProvider};
use crate::scene::{ContainerManager, Surface};
use crate::selection::SlotConfig;
use std::time::Duration;
use tokio::runtime::Handle;

/// Shared-state key under which the orchestrator stores the surface.
pub const SKIN_KEY: &str = "WordleSkin";

/// Flips the newest posts of the stream onto the wall as a list of cards.
#[derive(Debug, Clone)]
pub struct FlipInPosts {
    config: FlipInConfig,
    slots: SlotConfig,
    metrics: CardMetrics,
    container: ContainerManager,
}

impl Default for FlipInPosts {
    fn default() -> Self {
        Self::new(FlipInConfig::default())
    }
}

impl FlipInPosts {
    pub fn new(config: FlipInConfig) -> Self {
        Self {
            slots: SlotConfig::from(&config),
            metrics: CardMetrics::from(&config),
            container: ContainerManager::new(config.container_key.clone(), config.anchor),
            config,
        }
    }

    pub fn config(&self) -> &FlipInConfig {
        &self.config
    }
}

impl Step for FlipInPosts {
    fn do_step(&self, context: &MachineContext) -> Result<(), StepError> {
        let surface = context.get::<Surface>(SKIN_KEY)?;
        let stream = context.data_provider::<PostStreamProvider>()?;
        let avatars = context.data_provider::<AvatarProvider>()?;
        let runtime = Handle::try_current().map_err(|_| StepError::NoRuntime)?;

        let posts = stream.posts();
        let builder = CardBuilder::new(self.metrics, &avatars);
        // Build every card before touching the surface so a failed lookup
        // leaves the container as it was.
        let cards = self
            .slots
            .select(&posts)
            .into_iter()
            .map(|(slot, post)| builder.build(post, slot.max_width).map(|card| (slot, card)))
            .collect::<Result<Vec<_>, _>>()?;

        let container = self.container.get_or_create(&surface);
        let mut flip_ins = ParallelTransition::new();
        for (slot, card) in cards {
            flip_ins.add(
                FlipInTransition::with_timing(
                    card.pose.clone(),
                    self.config.flip_duration(),
                    self.config.frame_interval(),
                )
                .with_easing(self.config.easing),
            );
            container.append(card, slot.spacing);
        }

        tracing::info!(
            available = posts.len(),
            shown = flip_ins.len(),
            container = container.id(),
            total_cards = container.len(),
            "flipping in posts"
        );

        let proceed = context.proceed_signal();
        flip_ins.set_on_finished(move || {
            tracing::debug!("flip-in finished");
            proceed.proceed();
        });
        flip_ins.play(&runtime);
        Ok(())
    }

    fn preferred_step_duration(&self, _context: &MachineContext) -> Duration {
        self.config.step_duration()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlipInPostsFactory;

impl StepFactory for FlipInPostsFactory {
    fn step_name(&self) -> &'static str {
        "FlipInPosts"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Box<dyn Step>, StepError> {
        let config = match &definition.config {
            Some(value) => value
                .clone()
                .try_into::<FlipInConfig>()
                .map_err(|e| StepError::InvalidConfig(e.to_string()))?,
            None => FlipInConfig::default(),
        };
        config.validate().map_err(StepError::InvalidConfig)?;
        Ok(Box::new(FlipInPosts::new(config)))
    }

    fn required_data_providers(&self, _definition: &StepDefinition) -> Vec<ProviderKey> {
        vec![
            ProviderKey::of::<PostStreamProvider>(),
            ProviderKey::of::<AvatarProvider>(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::PoseState;
    use crate::feeds::{make_post, Avatar, GeneratedAvatars, Post, StaticAvatars};
    use crate::step::{
        check_required_providers, DataProviders, Proceed, ProceedReceiver, ProceedSignal,
    };
    use image::RgbaImage;
    use std::sync::Arc;

    struct Harness {
        context: MachineContext,
        proceed: ProceedReceiver,
        surface: Arc<Surface>,
        stream: Arc<PostStreamProvider>,
    }

    fn harness_with(posts: Vec<Post>, avatars: AvatarProvider) -> Harness {
        let stream = Arc::new(PostStreamProvider::new(50));
        // Accepting oldest first leaves the given order as provider order.
        stream.accept_all(posts.into_iter().rev());

        let mut providers = DataProviders::new();
        providers.register(stream.clone());
        providers.register(Arc::new(avatars));

        let (signal, proceed) = ProceedSignal::channel();
        let mut context = MachineContext::new(providers, signal);
        let surface = Arc::new(Surface::new(1920.0, 1280.0));
        context.put(SKIN_KEY, surface.clone());

        Harness {
            context,
            proceed,
            surface,
            stream,
        }
    }

    fn harness(n: usize) -> Harness {
        harness_with(
            (0..n).map(make_post).collect(),
            AvatarProvider::new(GeneratedAvatars::default()),
        )
    }

    fn shown_ids(surface: &Surface) -> Vec<String> {
        surface
            .lookup("tweetList")
            .map(|c| c.children().into_iter().map(|card| card.post_id).collect())
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_shows_at_most_seven_posts_in_order() {
        for n in [1, 5, 7, 8, 20] {
            let mut h = harness(n);
            FlipInPosts::default().do_step(&h.context).unwrap();

            let expected: Vec<String> = (0..n.min(7)).map(|i| format!("post-{}", i)).collect();
            assert_eq!(shown_ids(&h.surface), expected, "n = {}", n);

            assert_eq!(h.proceed.recv().await, Some(Proceed));
            assert!(h.proceed.try_recv().is_err());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stream_still_proceeds() {
        let mut h = harness(0);
        FlipInPosts::default().do_step(&h.context).unwrap();

        assert!(shown_ids(&h.surface).is_empty());
        assert!(h.proceed.recv().await.is_some());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.proceed.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_proceed_waits_for_flip_ins() {
        let mut h = harness(3);
        let started = tokio::time::Instant::now();
        FlipInPosts::default().do_step(&h.context).unwrap();
        assert!(h.proceed.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.proceed.try_recv().is_err());

        assert!(h.proceed.recv().await.is_some());
        assert!(started.elapsed() >= Duration::from_millis(1000));
        for card in h.surface.lookup("tweetList").unwrap().children() {
            assert_eq!(card.pose.get(), PoseState::FACE_ON);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_invocation_appends_to_same_container() {
        let mut h = harness(3);
        let step = FlipInPosts::default();

        step.do_step(&h.context).unwrap();
        let first = h.surface.lookup("tweetList").unwrap();
        h.proceed.recv().await.unwrap();

        h.stream.accept(make_post(9));
        step.do_step(&h.context).unwrap();
        h.proceed.recv().await.unwrap();

        let second = h.surface.lookup("tweetList").unwrap();
        assert!(first.same_node(&second));
        assert_eq!(h.surface.node_count(), 1);
        assert_eq!(
            shown_ids(&h.surface),
            vec!["post-0", "post-1", "post-2", "post-9", "post-0", "post-1", "post-2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cards_use_slot_layout() {
        let h = harness(7);
        FlipInPosts::default().do_step(&h.context).unwrap();

        let container = h.surface.lookup("tweetList").unwrap();
        for card in container.children() {
            assert_eq!(card.width(), 674.0);
            assert_eq!(card.margin_bottom, 20.0);
        }
        let (x, y) = container.layout_position().unwrap();
        assert!((x - 1000.0).abs() < 1e-9 && (y - 200.0).abs() < 1e-9);

        h.surface.resize(960.0, 640.0);
        let (x, y) = container.layout_position().unwrap();
        assert!((x - 500.0).abs() < 1e-9 && (y - 100.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiline_post_is_joined() {
        let mut post = make_post(0);
        post.text = "line1\nline2".to_string();
        let h = harness_with(vec![post], AvatarProvider::new(GeneratedAvatars::default()));
        FlipInPosts::default().do_step(&h.context).unwrap();

        let card = &h.surface.lookup("tweetList").unwrap().children()[0];
        assert_eq!(card.flow.text.text, "line1|line2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_avatar_fails_without_side_effects() {
        let avatars = StaticAvatars::new().with("user0", Avatar::new(RgbaImage::new(4, 4)));
        let mut h = harness_with(
            vec![make_post(0), make_post(1)],
            AvatarProvider::new(avatars),
        );

        let err = FlipInPosts::default().do_step(&h.context).unwrap_err();
        assert_eq!(
            err,
            StepError::MissingAvatar {
                handle: "user1".to_string()
            }
        );
        assert!(h.surface.lookup("tweetList").is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(h.proceed.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_surface_fails() {
        let mut providers = DataProviders::new();
        providers.register(Arc::new(PostStreamProvider::default()));
        providers.register(Arc::new(AvatarProvider::new(GeneratedAvatars::default())));
        let (signal, _rx) = ProceedSignal::channel();
        let context = MachineContext::new(providers, signal);

        let err = FlipInPosts::default().do_step(&context).unwrap_err();
        assert!(matches!(err, StepError::MissingState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_provider_fails() {
        let (signal, _rx) = ProceedSignal::channel();
        let mut context = MachineContext::new(DataProviders::new(), signal);
        context.put(SKIN_KEY, Arc::new(Surface::new(1920.0, 1280.0)));

        let err = FlipInPosts::default().do_step(&context).unwrap_err();
        assert_eq!(
            err,
            StepError::MissingProvider {
                provider: "PostStreamProvider"
            }
        );
    }

    #[test]
    fn test_without_runtime_fails_before_touching_surface() {
        let mut h = harness(1);

        let err = FlipInPosts::default().do_step(&h.context).unwrap_err();
        assert_eq!(err, StepError::NoRuntime);
        assert!(h.surface.lookup("tweetList").is_none());
        assert!(h.proceed.try_recv().is_err());
    }

    #[test]
    fn test_preferred_duration_is_fixed() {
        let few = harness(1);
        let many = harness(20);
        let step = FlipInPosts::default();
        assert_eq!(
            step.preferred_step_duration(&few.context),
            Duration::from_secs(15)
        );
        assert_eq!(
            step.preferred_step_duration(&many.context),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_factory_declares_providers() {
        let factory = FlipInPostsFactory;
        let definition = StepDefinition::new("FlipInPosts");
        let required = factory.required_data_providers(&definition);
        assert_eq!(
            required,
            vec![
                ProviderKey::of::<PostStreamProvider>(),
                ProviderKey::of::<AvatarProvider>()
            ]
        );

        let mut providers = DataProviders::new();
        providers.register(Arc::new(PostStreamProvider::default()));
        assert_eq!(
            check_required_providers(&factory, &definition, &providers).unwrap_err(),
            StepError::MissingProvider {
                provider: "AvatarProvider"
            }
        );
        providers.register(Arc::new(AvatarProvider::new(GeneratedAvatars::default())));
        assert!(check_required_providers(&factory, &definition, &providers).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_factory_reads_definition_config() {
        let definition = StepDefinition::new("FlipInPosts")
            .with_config(toml::from_str("cap = 3\nmax_width = 400.0").unwrap());
        let step = FlipInPostsFactory.create(&definition).unwrap();

        let mut h = harness(5);
        step.do_step(&h.context).unwrap();
        h.proceed.recv().await.unwrap();

        let cards = h.surface.lookup("tweetList").unwrap().children();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].width(), 474.0);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let definition =
            StepDefinition::new("FlipInPosts").with_config(toml::from_str("cap = 0").unwrap());
        assert!(matches!(
            FlipInPostsFactory.create(&definition),
            Err(StepError::InvalidConfig(_))
        ));
    }
}
