//! Plays prepared [AnimationItem]s one after the other, strictly in sequence-index order:
//! the next item only starts once every layer of the current one signaled completion.
//! ```text
//!   Idle --start()--> Playing(item) --> Draining(item) --last layer done--> Playing(next item) ... --> Done
//! ```
//! Lives on the presentation thread. Layer objects are reached through a [LayerBoard].

use super::model::{AnimationItem, LayerTag};
use std::collections::VecDeque;
use log::{debug, trace};


/// Called, on the presentation thread, once everything was played
pub type DoneCallback = Box<dyn FnOnce() + Send>;

/// Gives the sequencer access to the layer objects of its view
pub trait LayerBoard {

    /// makes the layer tagged `tag` visible and starts playing it `loop_count` times.\
    /// Returns `false` if no layer object exists for `tag`.
    fn start_layer(&mut self, tag: LayerTag, loop_count: u32) -> bool;

    /// discards the (finished) layer tagged `tag`.\
    /// Returns `false` if it was already gone.
    fn remove_layer(&mut self, tag: LayerTag) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    /// layers of item `index` are being started
    Playing  { index: usize },
    /// waiting for the started layers of item `index` to finish
    Draining { index: usize, total: usize, completed: usize },
    Done,
}

/// What happened after feeding the sequencer an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// some layer is still playing
    Playing,
    /// the queue is exhausted and the done callback was just called
    Finished,
    /// the event did not concern the item being played
    Ignored,
}

pub struct Sequencer {
    queue:   VecDeque<AnimationItem>,
    state:   SequencerState,
    on_done: Option<DoneCallback>,
}

impl Sequencer {

    pub fn new(on_done: DoneCallback) -> Self {
        Self {
            queue:   VecDeque::new(),
            state:   SequencerState::Idle,
            on_done: Some(on_done),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// number of items still waiting to be played
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Enqueues `items` (sorted by their sequence index) and, if idle, starts playing them.\
    /// An empty `items` finishes right away.
    pub fn start(&mut self, mut items: Vec<AnimationItem>, board: &mut impl LayerBoard) -> Progress {
        items.sort_by_key(|item| item.index);
        self.queue.extend(items);
        match self.state {
            SequencerState::Idle => self.advance(board),
            SequencerState::Done => Progress::Ignored,
            _ => Progress::Playing,
        }
    }

    /// Accounts for the completion of the layer tagged `tag`, moving on to the next item when
    /// it was the last one of the current item
    pub fn layer_finished(&mut self, tag: LayerTag, board: &mut impl LayerBoard) -> Progress {
        let SequencerState::Draining { index, total, completed } = self.state else {
            trace!("Sequencer: completion of layer {} ignored in state {:?}", tag, self.state);
            return Progress::Ignored
        };
        if tag.item != index {
            trace!("Sequencer: completion of layer {} ignored: item {} is playing", tag, index);
            return Progress::Ignored
        }
        if !board.remove_layer(tag) {
            trace!("Sequencer: repeated completion of layer {} ignored", tag);
            return Progress::Ignored
        }
        let completed = completed + 1;
        if completed < total {
            self.state = SequencerState::Draining { index, total, completed };
            Progress::Playing
        } else {
            debug!("Sequencer: item {} finished", index);
            self.advance(board)
        }
    }

    /// starts the next item having something to play -- or finishes
    fn advance(&mut self, board: &mut impl LayerBoard) -> Progress {
        while let Some(item) = self.queue.pop_front() {
            self.state = SequencerState::Playing { index: item.index };
            let total = item.sub_items.len();
            let mut completed = 0;
            for sub_item in &item.sub_items {
                if !board.start_layer(sub_item.tag, item.repeat_count) {
                    // no layer object: counts as done
                    completed += 1;
                }
            }
            debug!("Sequencer: item {} ('{}') started {} of {} layer(s), {} loop(s)",
                   item.index, item.path.display(), total - completed, total, item.repeat_count);
            if completed < total {
                self.state = SequencerState::Draining { index: item.index, total, completed };
                return Progress::Playing
            }
        }
        self.state = SequencerState::Done;
        if let Some(on_done) = self.on_done.take() {
            on_done();
        }
        Progress::Finished
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::model::SubItem;
    use std::{
        collections::HashSet,
        path::PathBuf,
        sync::{Arc, atomic::{AtomicUsize, Ordering}},
    };

    #[derive(Debug, PartialEq)]
    enum Event {
        Start(LayerTag, u32),
        Remove(LayerTag),
    }

    #[derive(Default)]
    struct FakeBoard {
        layers: HashSet<LayerTag>,
        events: Vec<Event>,
    }

    impl LayerBoard for FakeBoard {
        fn start_layer(&mut self, tag: LayerTag, loop_count: u32) -> bool {
            if self.layers.contains(&tag) {
                self.events.push(Event::Start(tag, loop_count));
                true
            } else {
                false
            }
        }
        fn remove_layer(&mut self, tag: LayerTag) -> bool {
            let removed = self.layers.remove(&tag);
            if removed {
                self.events.push(Event::Remove(tag));
            }
            removed
        }
    }

    fn item(index: usize, repeat_count: u32, layers: usize, board: &mut FakeBoard) -> AnimationItem {
        let mut item = AnimationItem::new(PathBuf::from(format!("anim_{}", index)), index);
        item.repeat_count = repeat_count;
        item.sub_items = (0..layers)
            .map(|position| {
                let tag = LayerTag::new(index, position);
                board.layers.insert(tag);
                SubItem { tag, animation: None, images: None }
            })
            .collect();
        item
    }

    fn counting_callback() -> (Arc<AtomicUsize>, DoneCallback) {
        let calls = Arc::new(AtomicUsize::new(0));
        let callback_calls = Arc::clone(&calls);
        (calls, Box::new(move || { callback_calls.fetch_add(1, Ordering::SeqCst); }))
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn empty_request_finishes_immediately() {
        let (calls, on_done) = counting_callback();
        let mut sequencer = Sequencer::new(on_done);
        let mut board = FakeBoard::default();
        assert_eq!(sequencer.start(vec![], &mut board), Progress::Finished);
        assert_eq!(sequencer.state(), SequencerState::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn items_play_one_after_the_other() {
        let (calls, on_done) = counting_callback();
        let mut sequencer = Sequencer::new(on_done);
        let mut board = FakeBoard::default();
        let items = vec![item(1, 1, 1, &mut board), item(0, 2, 2, &mut board)];

        assert_eq!(sequencer.start(items, &mut board), Progress::Playing);
        assert_eq!(board.events, vec![Event::Start(LayerTag::new(0, 0), 2), Event::Start(LayerTag::new(0, 1), 2)]);
        assert_eq!(sequencer.state(), SequencerState::Draining { index: 0, total: 2, completed: 0 });

        // item 1 must wait for both layers of item 0
        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 1), &mut board), Progress::Playing);
        assert!(!board.events.contains(&Event::Start(LayerTag::new(1, 0), 1)));
        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 0), &mut board), Progress::Playing);
        assert_eq!(board.events[2..], [Event::Remove(LayerTag::new(0, 1)), Event::Remove(LayerTag::new(0, 0)), Event::Start(LayerTag::new(1, 0), 1)]);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 0), &mut board), Progress::Finished);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(board.layers.is_empty());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn items_without_layers_are_instantly_complete() {
        let (calls, on_done) = counting_callback();
        let mut sequencer = Sequencer::new(on_done);
        let mut board = FakeBoard::default();
        let mut missing_layer_object = item(1, 1, 2, &mut board);
        board.layers.remove(&LayerTag::new(1, 0));
        missing_layer_object.repeat_count = 3;
        let items = vec![item(0, 1, 0, &mut board), missing_layer_object, item(2, 1, 0, &mut board)];

        assert_eq!(sequencer.start(items, &mut board), Progress::Playing);
        assert_eq!(board.events, vec![Event::Start(LayerTag::new(1, 1), 3)]);
        assert_eq!(sequencer.state(), SequencerState::Draining { index: 1, total: 2, completed: 1 });
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 1), &mut board), Progress::Finished);
        assert_eq!(sequencer.pending(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn stale_completions_are_ignored() {
        let (calls, on_done) = counting_callback();
        let mut sequencer = Sequencer::new(on_done);
        let mut board = FakeBoard::default();
        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 0), &mut board), Progress::Ignored);
        let items = vec![item(0, 1, 1, &mut board), item(1, 1, 1, &mut board)];
        sequencer.start(items, &mut board);
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 0), &mut board), Progress::Ignored);
        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 0), &mut board), Progress::Playing);
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 0), &mut board), Progress::Finished);
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 0), &mut board), Progress::Ignored);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn repeated_completions_do_not_skip_playing_siblings() {
        let (calls, on_done) = counting_callback();
        let mut sequencer = Sequencer::new(on_done);
        let mut board = FakeBoard::default();
        let items = vec![item(0, 1, 2, &mut board), item(1, 1, 1, &mut board)];
        sequencer.start(items, &mut board);

        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 0), &mut board), Progress::Playing);
        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 0), &mut board), Progress::Ignored);
        assert_eq!(sequencer.state(), SequencerState::Draining { index: 0, total: 2, completed: 1 });
        assert!(!board.events.contains(&Event::Start(LayerTag::new(1, 0), 1)));
        assert!(board.layers.contains(&LayerTag::new(0, 1)));

        assert_eq!(sequencer.layer_finished(LayerTag::new(0, 1), &mut board), Progress::Playing);
        assert_eq!(board.events.last(), Some(&Event::Start(LayerTag::new(1, 0), 1)));
        assert_eq!(sequencer.layer_finished(LayerTag::new(1, 0), &mut board), Progress::Finished);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
