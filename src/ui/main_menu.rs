use super::common::MenuChoice;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainChoice {
    StartMapping,
    RunDemo,
    ResetController,
    Configuration,
    Exit,
}

impl MenuChoice for MainChoice {
    const ALL: &'static [Self] = &[
        MainChoice::StartMapping,
        MainChoice::RunDemo,
        MainChoice::ResetController,
        MainChoice::Configuration,
        MainChoice::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            MainChoice::StartMapping => "Start keyboard and mouse mapping",
            MainChoice::RunDemo => "Run demo sequence",
            MainChoice::ResetController => "Reset controller",
            MainChoice::Configuration => "Configuration menu",
            MainChoice::Exit => "Exit",
        }
    }
}
