use nih_plug::prelude::{Editor, GuiContext};
use nih_plug_iced::widgets as nih_widgets;
use nih_plug_iced::*;
use std::sync::Arc;

use crate::params::IirFilterParams;

pub(crate) fn default_state() -> Arc<IcedState> {
    IcedState::from_size(300, 200)
}

pub(crate) fn create(
    params: Arc<IirFilterParams>,
    editor_state: Arc<IcedState>,
) -> Option<Box<dyn Editor>> {
    create_iced_editor::<IirFilterEditor>(editor_state, params)
}

struct IirFilterEditor {
    params: Arc<IirFilterParams>,
    context: Arc<dyn GuiContext>,

    cutoff_slider_state: nih_widgets::param_slider::State,
    q_slider_state: nih_widgets::param_slider::State,
}

#[derive(Debug, Clone, Copy)]
enum Message {
    /// Update a parameter's value.
    ParamUpdate(nih_widgets::ParamMessage),
}

impl IcedEditor for IirFilterEditor {
    type Executor = executor::Default;
    type Message = Message;
    type InitializationFlags = Arc<IirFilterParams>;

    fn new(
        params: Self::InitializationFlags,
        context: Arc<dyn GuiContext>,
    ) -> (Self, Command<Self::Message>) {
        let editor = IirFilterEditor {
            params,
            context,

            cutoff_slider_state: Default::default(),
            q_slider_state: Default::default(),
        };

        (editor, Command::none())
    }

    fn context(&self) -> &dyn GuiContext {
        self.context.as_ref()
    }

    fn update(
        &mut self,
        _window: &mut WindowQueue,
        message: Self::Message,
    ) -> Command<Self::Message> {
        match message {
            // スライダー操作はホスト経由で bridge のコールバックまで届く
            Message::ParamUpdate(message) => self.handle_param_message(message),
        }

        Command::none()
    }

    fn view(&mut self) -> Element<'_, Self::Message> {
        Column::new()
            .align_items(Alignment::Center)
            .padding(20)
            .spacing(10)
            .push(
                Text::new("IIR Lowpass")
                    .font(assets::NOTO_SANS_LIGHT)
                    .size(24)
                    .height(30.into())
                    .width(Length::Fill)
                    .horizontal_alignment(alignment::Horizontal::Center)
                    .vertical_alignment(alignment::Vertical::Bottom),
            )
            .push(Text::new("Freq").size(14))
            .push(
                nih_widgets::ParamSlider::new(&mut self.cutoff_slider_state, &self.params.cutoff)
                    .map(Message::ParamUpdate),
            )
            .push(Text::new("Q").size(14))
            .push(
                nih_widgets::ParamSlider::new(&mut self.q_slider_state, &self.params.q)
                    .map(Message::ParamUpdate),
            )
            .into()
    }

    fn background_color(&self) -> nih_plug_iced::Color {
        nih_plug_iced::Color {
            r: 0.98,
            g: 0.98,
            b: 0.98,
            a: 1.0,
        }
    }
}
