//! First-run walkthrough of the anamnesis screen, plus sample inputs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialStep {
    pub id: &'static str,
    pub title: &'static str,
    pub body: &'static str,
}

pub const ANAMNESIS_STEPS: [TutorialStep; 5] = [
    TutorialStep {
        id: "welcome",
        title: "Анамнез жизни",
        body: "Главная страница для диагностики. Здесь вы вводите жалобы пациента и получаете гипотезы по клиническим протоколам МЗ РК.",
    },
    TutorialStep {
        id: "input",
        title: "Ввод анамнеза",
        body: "Опишите симптомы в свободной форме или выберите пример ниже. До 2000 символов на русском.",
    },
    TutorialStep {
        id: "analyze",
        title: "Анализ",
        body: "Запустите анализ: система найдёт протоколы и вернёт основной диагноз с МКБ-10 и дифференциальные варианты.",
    },
    TutorialStep {
        id: "results",
        title: "Результаты",
        body: "Здесь появятся диагноз, код МКБ-10 и ссылка на протокол MedElement. История сохраняется в разделе «История».",
    },
    TutorialStep {
        id: "api",
        title: "Для организаторов",
        body: "Оценка: POST /diagnose с телом {\"query\": \"...\"}. Ответ: список диагнозов (icd10_code, diagnosis, explanation, protocol_id).",
    },
];

pub const EXAMPLE_PROMPTS: [&str; 3] = [
    "Пациент 45 лет, жалобы на острую боль в правой нижней части живота, тошнота, температура 38.2 C",
    "Ребёнок 7 лет, кашель 5 дней, насморк, температура 37.5 C, хрипы в лёгких",
    "Женщина 55 лет, головная боль, головокружение, повышение АД 160 на 100",
];

/// Cursor over a fixed list of steps.
#[derive(Debug, Clone)]
pub struct Tutorial {
    steps: &'static [TutorialStep],
    index: usize,
}

impl Default for Tutorial {
    fn default() -> Self {
        Self::new(&ANAMNESIS_STEPS)
    }
}

impl Tutorial {
    pub fn new(steps: &'static [TutorialStep]) -> Self {
        Self { steps, index: 0 }
    }

    pub fn current(&self) -> Option<&'static TutorialStep> {
        self.steps.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.steps.len()
    }

    /// Advance; returns false at the last step.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Step back; returns false at the first step.
    pub fn back(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        true
    }
}
