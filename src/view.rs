#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Optimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Chat,
    ResolutionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Home,
    Optimize,
    Chat,
    ResolutionConfig,
}

impl From<Page> for Surface {
    fn from(page: Page) -> Self {
        match page {
            Page::Home => Surface::Home,
            Page::Optimize => Surface::Optimize,
        }
    }
}

impl From<Overlay> for Surface {
    fn from(overlay: Overlay) -> Self {
        match overlay {
            Overlay::Chat => Surface::Chat,
            Overlay::ResolutionConfig => Surface::ResolutionConfig,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Navigate(Page),
    Open(Overlay),
    Close(Overlay),
    /// Click on an overlay backdrop; `inside_content` is true when it landed on the content box.
    Backdrop {
        overlay: Overlay,
        inside_content: bool,
    },
}

/// What a transition did, so callers can react (e.g. fetch the catalog on entering Optimize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewChange {
    pub entered: Option<Surface>,
    pub closed: Option<Overlay>,
}

/// One page is always shown; at most one overlay sits on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    page: Page,
    overlay: Option<Overlay>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            page: Page::Home,
            overlay: None,
        }
    }
}

impl ViewState {
    pub fn handle(&mut self, event: ViewEvent) -> ViewChange {
        match event {
            ViewEvent::Navigate(page) => {
                let closed = self.overlay.take();
                let entered = (self.page != page).then_some(Surface::from(page));
                self.page = page;
                ViewChange { entered, closed }
            }
            ViewEvent::Open(overlay) => {
                if self.overlay == Some(overlay) {
                    return ViewChange::default();
                }
                let closed = self.overlay.replace(overlay);
                ViewChange {
                    entered: Some(Surface::from(overlay)),
                    closed,
                }
            }
            ViewEvent::Close(overlay) => self.close(overlay),
            ViewEvent::Backdrop {
                overlay,
                inside_content,
            } => {
                if inside_content {
                    ViewChange::default()
                } else {
                    self.close(overlay)
                }
            }
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    /// Foreground surface: the overlay when one is open, the page otherwise.
    pub fn active(&self) -> Surface {
        match self.overlay {
            Some(overlay) => overlay.into(),
            None => self.page.into(),
        }
    }

    pub fn is_visible(&self, surface: Surface) -> bool {
        self.active() == surface
    }

    fn close(&mut self, overlay: Overlay) -> ViewChange {
        if self.overlay != Some(overlay) {
            return ViewChange::default();
        }
        self.overlay = None;
        ViewChange {
            entered: None,
            closed: Some(overlay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_overlay_replaces_earlier_one() {
        let mut view = ViewState::default();
        view.handle(ViewEvent::Navigate(Page::Optimize));
        view.handle(ViewEvent::Open(Overlay::Chat));
        let change = view.handle(ViewEvent::Open(Overlay::ResolutionConfig));

        assert_eq!(change.closed, Some(Overlay::Chat));
        assert!(view.is_visible(Surface::ResolutionConfig));
        assert!(!view.is_visible(Surface::Chat));
        assert!(!view.is_visible(Surface::Optimize));
        assert_eq!(view.page(), Page::Optimize);
    }

    #[test]
    fn navigation_force_closes_overlay() {
        let mut view = ViewState::default();
        view.handle(ViewEvent::Open(Overlay::Chat));
        let change = view.handle(ViewEvent::Navigate(Page::Optimize));
        assert_eq!(change.closed, Some(Overlay::Chat));
        assert_eq!(change.entered, Some(Surface::Optimize));
        assert_eq!(view.overlay(), None);
        assert!(view.is_visible(Surface::Optimize));

        let change = view.handle(ViewEvent::Navigate(Page::Optimize));
        assert_eq!(change.entered, None);
    }

    #[test]
    fn backdrop_click_only_closes_outside_content() {
        let mut view = ViewState::default();
        view.handle(ViewEvent::Open(Overlay::ResolutionConfig));
        view.handle(ViewEvent::Backdrop {
            overlay: Overlay::ResolutionConfig,
            inside_content: true,
        });
        assert_eq!(view.overlay(), Some(Overlay::ResolutionConfig));
        view.handle(ViewEvent::Backdrop {
            overlay: Overlay::ResolutionConfig,
            inside_content: false,
        });
        assert_eq!(view.overlay(), None);
        assert!(view.is_visible(Surface::Home));
    }

    #[test]
    fn closing_an_overlay_that_is_not_open_is_a_no_op() {
        let mut view = ViewState::default();
        view.handle(ViewEvent::Open(Overlay::Chat));
        let change = view.handle(ViewEvent::Close(Overlay::ResolutionConfig));
        assert_eq!(change, ViewChange::default());
        assert_eq!(view.overlay(), Some(Overlay::Chat));
    }
}
