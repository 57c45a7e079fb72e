//! Error dialogs shown for failed calls.
//!
//! The controller does not draw anything itself. It assembles an
//! [`ErrorDialog`] and its buttons and hands them to a [`DialogPresenter`];
//! navigation requested by the dismiss button goes through a [`Navigator`].

use crate::error::ApiError;
use std::fmt;
use std::sync::Arc;

/// A shared, argument-less callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

pub const DEFAULT_TITLE: &str = "Error";
pub const DEFAULT_MESSAGE: &str = "An unexpected error occurred. Please try again later.";
pub const TRY_AGAIN_TEXT: &str = "Try Again";
pub const DISMISS_TEXT: &str = "OK";

/// Displays a modal dialog.
pub trait DialogPresenter: Send + Sync {
    fn present(&self, title: &str, message: &str, buttons: Vec<DialogButton>);
}

/// Moves between screens of the host application.
pub trait Navigator: Send + Sync {
    fn back(&self);
    fn replace(&self, target: &str);
    fn navigate(&self, target: &str);
    /// Pops screens until `target` is on top.
    fn dismiss_to(&self, target: &str);
}

/// Where the dismiss button takes the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Back,
    Replace(String),
    Push(String),
    DismissTo(String),
}

impl Navigation {
    pub fn apply(&self, navigator: &dyn Navigator) {
        match self {
            Navigation::Back => navigator.back(),
            Navigation::Replace(target) => navigator.replace(target),
            Navigation::Push(target) => navigator.navigate(target),
            Navigation::DismissTo(target) => navigator.dismiss_to(target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    #[default]
    Default,
    Cancel,
    Destructive,
}

/// One action button of a dialog.
#[derive(Clone)]
pub struct DialogButton {
    pub text: String,
    pub style: ButtonStyle,
    on_press: Option<Callback>,
}

impl DialogButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ButtonStyle::Default,
            on_press: None,
        }
    }

    pub fn with_style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn on_press(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_press = Some(Arc::new(action));
        self
    }

    /// Runs the button's action, if it has one.
    pub fn press(&self) {
        if let Some(action) = &self.on_press {
            action();
        }
    }
}

impl fmt::Debug for DialogButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogButton")
            .field("text", &self.text)
            .field("style", &self.style)
            .field("has_action", &self.on_press.is_some())
            .finish()
    }
}

/// Button policy of an [`ErrorDialog`].
#[derive(Clone, Default)]
pub struct DialogOptions {
    /// Called by the dismiss button when no navigation is set.
    pub on_dismiss: Option<Callback>,
    /// Navigation performed by the dismiss button.
    pub navigate: Option<Navigation>,
    /// Always add the dismiss button, even next to other buttons.
    pub cancel: bool,
    /// Add a button re-running the call with its last parameters.
    pub try_again: bool,
    pub custom_buttons: Vec<DialogButton>,
}

/// Title, message and buttons shown when a call fails.
///
/// # Examples
///
/// ```
/// use pagewise::{ErrorDialog, Navigation};
///
/// let dialog = ErrorDialog::new("Error", "Failed to save the child. Please try again later.")
///     .with_try_again()
///     .with_cancel()
///     .with_navigation(Navigation::Back);
/// assert!(dialog.options.try_again);
/// ```
#[derive(Clone)]
pub struct ErrorDialog {
    pub title: String,
    pub message: String,
    pub options: DialogOptions,
}

impl ErrorDialog {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            options: DialogOptions::default(),
        }
    }

    pub fn with_try_again(mut self) -> Self {
        self.options.try_again = true;
        self
    }

    pub fn with_cancel(mut self) -> Self {
        self.options.cancel = true;
        self
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.options.navigate = Some(navigation);
        self
    }

    pub fn on_dismiss(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.options.on_dismiss = Some(Arc::new(action));
        self
    }

    pub fn with_button(mut self, button: DialogButton) -> Self {
        self.options.custom_buttons.push(button);
        self
    }

    /// Assembles the buttons in display order.
    ///
    /// "Try Again" comes first when requested and a retry action exists, then
    /// the custom buttons. A single cancel-style "OK" button closes the list when
    /// it would otherwise be empty or when `cancel` is set. Pressing it performs
    /// the navigation if one is set, otherwise the `on_dismiss` callback.
    pub fn buttons(
        &self,
        retry: Option<Callback>,
        navigator: Option<Arc<dyn Navigator>>,
    ) -> Vec<DialogButton> {
        let options = &self.options;
        let mut buttons = Vec::with_capacity(options.custom_buttons.len() + 2);

        if options.try_again {
            if let Some(retry) = retry {
                buttons.push(DialogButton {
                    text: TRY_AGAIN_TEXT.to_string(),
                    style: ButtonStyle::Default,
                    on_press: Some(retry),
                });
            }
        }

        buttons.extend(options.custom_buttons.iter().cloned());

        if buttons.is_empty() || options.cancel {
            let navigation = options.navigate.clone();
            let on_dismiss = options.on_dismiss.clone();
            buttons.push(
                DialogButton::new(DISMISS_TEXT)
                    .with_style(ButtonStyle::Cancel)
                    .on_press(move || match (&navigation, &navigator) {
                        (Some(navigation), Some(navigator)) => navigation.apply(navigator.as_ref()),
                        (Some(navigation), None) => {
                            tracing::warn!(?navigation, "No navigator configured for dismiss action");
                        }
                        (None, _) => {
                            if let Some(on_dismiss) = &on_dismiss {
                                on_dismiss();
                            }
                        }
                    }),
            );
        }

        buttons
    }
}

impl Default for ErrorDialog {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_MESSAGE)
    }
}

impl fmt::Debug for ErrorDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDialog")
            .field("title", &self.title)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Where a controller gets the dialog for a failure.
#[derive(Clone)]
pub enum ErrorDialogSource {
    /// The same dialog for every failure.
    Static(ErrorDialog),
    /// A dialog built from the failure.
    Computed(Arc<dyn Fn(&ApiError) -> ErrorDialog + Send + Sync>),
}

impl ErrorDialogSource {
    pub fn resolve(&self, error: &ApiError) -> ErrorDialog {
        match self {
            ErrorDialogSource::Static(dialog) => dialog.clone(),
            ErrorDialogSource::Computed(build) => build(error),
        }
    }
}

impl From<ErrorDialog> for ErrorDialogSource {
    fn from(dialog: ErrorDialog) -> Self {
        ErrorDialogSource::Static(dialog)
    }
}
