use serde::Serialize;

use crate::models::AppPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayPrompt {
    pub id: &'static str,
    pub category: &'static str,
    pub prompt: &'static str,
    pub word_limit: u32,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'static str>,
}

const fn prompt(
    id: &'static str,
    category: &'static str,
    prompt: &'static str,
    word_limit: u32,
    required: bool,
) -> EssayPrompt {
    EssayPrompt {
        id,
        category,
        prompt,
        word_limit,
        required,
        instructions: None,
    }
}

const fn pick_four(id: &'static str, category: &'static str, text: &'static str) -> EssayPrompt {
    EssayPrompt {
        instructions: Some("Choose 4 out of 8 questions"),
        ..prompt(id, category, text, 350, false)
    }
}

const COMMON_APP: &[EssayPrompt] = &[
    prompt("commonapp-1", "Personal Statement", "Some students have a background, identity, interest, or talent that is so meaningful they believe their application would be incomplete without it. If this sounds like you, then please share your story.", 650, true),
    prompt("commonapp-2", "Personal Statement", "The lessons we take from obstacles we encounter can be fundamental to later success. Recount a time when you faced a challenge, setback, or failure. How did it affect you, and what did you learn from the experience?", 650, true),
    prompt("commonapp-3", "Personal Statement", "Reflect on a time when you questioned or challenged a belief or idea. What prompted your thinking? What was the outcome?", 650, true),
    prompt("commonapp-4", "Personal Statement", "Reflect on something that someone has done for you that has made you happy or thankful in a surprising way. How has this gratitude affected or motivated you?", 650, true),
    prompt("commonapp-5", "Personal Statement", "Discuss an accomplishment, event, or realization that sparked a period of personal growth and a new understanding of yourself or others.", 650, true),
    prompt("commonapp-6", "Personal Statement", "Describe a topic, idea, or concept you find so engaging that it makes you lose all track of time. Why does it captivate you? What or who do you turn to when you want to learn more?", 650, true),
    prompt("commonapp-7", "Personal Statement", "Share an essay on any topic of your choice. It can be one you've already written, one that responds to a different prompt, or one of your own design.", 650, true),
];

const UC: &[EssayPrompt] = &[
    pick_four("uc-1", "Personal Insight Question 1", "Describe an example of your leadership experience in which you have positively influenced others, helped resolve disputes or contributed to group efforts over time."),
    pick_four("uc-2", "Personal Insight Question 2", "Every person has a creative side, and it can be expressed in many ways: problem solving, original and innovative thinking, and artistically, to name a few. Describe how you express your creative side."),
    pick_four("uc-3", "Personal Insight Question 3", "What would you say is your greatest talent or skill? How have you developed and demonstrated that talent over time?"),
    pick_four("uc-4", "Personal Insight Question 4", "Describe how you have taken advantage of a significant educational opportunity or worked to overcome an educational barrier you have faced."),
    pick_four("uc-5", "Personal Insight Question 5", "Describe the most significant challenge you have faced and the steps you have taken to overcome this challenge. How has this challenge affected your academic achievement?"),
    pick_four("uc-6", "Personal Insight Question 6", "Think about an academic subject that inspires you. Describe how you have furthered this interest inside and/or outside of the classroom."),
    pick_four("uc-7", "Personal Insight Question 7", "What have you done to make your school or your community a better place?"),
    pick_four("uc-8", "Personal Insight Question 8", "Beyond what has already been shared in your application, what do you believe makes you a strong candidate for admissions to the University of California?"),
];

const MIT: &[EssayPrompt] = &[
    prompt("mit-1", "Main Essay", "We know you lead a busy life, full of activities, many of which are required of you. Tell us about something you do simply for the pleasure of it.", 200, true),
    prompt("mit-2", "Main Essay", "Although you may not yet know what you want to major in, which department or program at MIT appeals to you and why?", 100, true),
    prompt("mit-3", "Main Essay", "At MIT, we bring people together to better the lives of others. MIT students work to improve their communities in different ways, from tackling the world's biggest challenges to being a good friend. Describe one way in which you have contributed to your community, whether in your family, the classroom, your neighborhood, etc.", 200, true),
    prompt("mit-4", "Main Essay", "Describe the world you come from; for example, your family, clubs, school, community, city, or town. How has that world shaped your dreams and aspirations?", 250, true),
    prompt("mit-5", "Main Essay", "Tell us about the most significant challenge you've faced or something important that didn't go according to plan. How did you manage the situation?", 250, true),
];

const COALITION_APP: &[EssayPrompt] = &[
    prompt("coalition-1", "Personal Statement", "Tell a story from your life, describing an experience that either demonstrates your character or helped to shape it.", 550, true),
    prompt("coalition-2", "Personal Statement", "Describe a time when you made a meaningful contribution to others in which the greater good was your focus. Discuss the challenges and rewards of making your contribution.", 550, true),
    prompt("coalition-3", "Personal Statement", "Has there been a time when you've had a long-cherished or accepted belief challenged? How did you respond? How did the challenge affect your beliefs?", 550, true),
    prompt("coalition-4", "Personal Statement", "What is the hardest part of being a student now? What's the best part? What advice would you give a younger sibling or friend (assuming they would listen to you)?", 550, true),
    prompt("coalition-5", "Personal Statement", "Submit an essay on a topic of your choice.", 550, true),
];

const OTHER: &[EssayPrompt] = &[
    prompt("other-1", "General Essay", "Why do you want to attend this college?", 500, false),
    prompt("other-2", "General Essay", "What academic or professional interests are you hoping to pursue?", 500, false),
    prompt("other-3", "General Essay", "Describe a significant experience or achievement that has special meaning to you.", 500, false),
    prompt("other-4", "Supplemental Essay", "How will you contribute to our campus community?", 300, false),
    prompt("other-5", "Supplemental Essay", "Tell us about a challenge you've overcome.", 300, false),
];

const STANFORD: &[EssayPrompt] = &[
    prompt("stanford-1", "Short Answer", "The Stanford community is deeply curious and driven to learn in and out of the classroom. Reflect on an idea or experience that makes you genuinely excited about learning.", 250, true),
    prompt("stanford-2", "Short Answer", "Virtually all of Stanford's undergraduates live on campus. Write a note to your future roommate that reveals something about you or that will help your roommate (and us) get to know you better.", 250, true),
    prompt("stanford-3", "Short Answer", "Tell us about something that is meaningful to you and why.", 250, true),
];

const HARVARD: &[EssayPrompt] = &[
    prompt("harvard-1", "Supplemental Essay", "Harvard has long recognized the importance of enrolling a diverse student body. How will the life experiences that shape who you are today enable you to contribute to Harvard?", 200, false),
    prompt("harvard-2", "Supplemental Essay", "Describe a time when you strongly disagreed with someone about an idea or issue. How did you communicate or engage with this person? What did you learn from this experience?", 200, false),
    prompt("harvard-3", "Supplemental Essay", "Briefly describe any of your extracurricular activities, employment experience, travel, or family responsibilities that have shaped who you are.", 200, false),
];

const UNIVERSITY_OF_WASHINGTON: &[EssayPrompt] = &[
    prompt("uw-1", "Main Essay", "Tell a story from your life, describing an experience that either demonstrates your character or helped to shape it.", 650, true),
    prompt("uw-2", "Supplemental Essay", "Our families and communities often define us and our individual worlds. Community might refer to your cultural group, extended family, religious group, neighborhood or school, sports team or club, co-workers, etc. Describe the world you come from and how you, as a product of it, might add to the diversity of the UW.", 300, true),
];

pub fn platform_prompts(platform: AppPlatform) -> &'static [EssayPrompt] {
    match platform {
        AppPlatform::CommonApp => COMMON_APP,
        AppPlatform::Uc => UC,
        AppPlatform::Mit => MIT,
        AppPlatform::CoalitionApp => COALITION_APP,
        AppPlatform::Other => OTHER,
    }
}

pub fn college_prompts(college_id: &str) -> Option<&'static [EssayPrompt]> {
    match college_id {
        "stanford-university" => Some(STANFORD),
        "harvard-university" => Some(HARVARD),
        "university-of-washington" => Some(UNIVERSITY_OF_WASHINGTON),
        _ => None,
    }
}

/// College-specific prompts when the college has its own, else the platform set
pub fn prompts_for_college(college_id: &str, platform_id: &str) -> &'static [EssayPrompt] {
    college_prompts(college_id).unwrap_or_else(|| platform_prompts(AppPlatform::from_id(platform_id)))
}
